//! Shutdown triggers: termination signals and the foreground console.

use std::fmt;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGPIPE, SIGQUIT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::{debug, info};

use super::PROCESS_TARGET;
use super::launch::LaunchMode;

/// Interval at which the wait loop checks for a delivered signal.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Console keyword that ends a foreground session.
const EXIT_KEYWORD: &str = "exit";

const TERMINATING_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Abstraction over shutdown notification mechanisms.
pub trait ShutdownSignal: Send + Sync {
    /// Installs the process signal handlers.
    fn install(&self) -> Result<(), ShutdownError>;

    /// Blocks until shutdown should proceed.
    fn wait(&self, mode: LaunchMode) -> Result<ShutdownCause, ShutdownError>;
}

/// Reason the bridge is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    /// A terminating signal arrived.
    Signal(i32),
    /// The operator typed `exit` on the console.
    ExitCommand,
    /// The console reached end of input.
    EndOfInput,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(signal) => write!(formatter, "signal {signal}"),
            Self::ExitCommand => formatter.write_str("exit command"),
            Self::EndOfInput => formatter.write_str("end of console input"),
        }
    }
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The console reader thread could not be spawned.
    #[error("failed to start console reader: {source}")]
    Console {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Shutdown listener backed by `signal-hook` flags and, in the foreground,
/// standard input.
///
/// `SIGPIPE` is caught so a write to a vanished peer surfaces as an I/O
/// error on that socket instead of killing the process.
#[derive(Debug, Clone, Default)]
pub struct SystemShutdownSignal {
    received: Arc<AtomicUsize>,
    broken_pipe: Arc<AtomicBool>,
}

impl SystemShutdownSignal {
    /// Builds a listener; handlers are registered by [`ShutdownSignal::install`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pending_signal(&self) -> Option<i32> {
        if self.broken_pipe.swap(false, Ordering::SeqCst) {
            debug!(target: PROCESS_TARGET, "broken pipe signal observed");
        }
        match self.received.load(Ordering::SeqCst) {
            0 => None,
            signal => i32::try_from(signal).ok(),
        }
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn install(&self) -> Result<(), ShutdownError> {
        for signal in TERMINATING_SIGNALS {
            let value = usize::try_from(signal).unwrap_or(usize::MAX);
            flag::register_usize(signal, Arc::clone(&self.received), value)
                .map_err(|source| ShutdownError::Install { source })?;
        }
        flag::register(SIGPIPE, Arc::clone(&self.broken_pipe))
            .map_err(|source| ShutdownError::Install { source })?;
        debug!(target: PROCESS_TARGET, "signal handlers installed");
        Ok(())
    }

    fn wait(&self, mode: LaunchMode) -> Result<ShutdownCause, ShutdownError> {
        let cause = match mode {
            LaunchMode::Background => loop {
                if let Some(signal) = self.pending_signal() {
                    break ShutdownCause::Signal(signal);
                }
                thread::sleep(POLL_INTERVAL);
            },
            LaunchMode::Foreground => {
                let console = spawn_console(BufReader::new(io::stdin()))?;
                wait_for_console(&console, || self.pending_signal())
            }
        };
        info!(target: PROCESS_TARGET, %cause, "shutdown requested");
        Ok(cause)
    }
}

/// One event read from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleInput {
    Line(String),
    Closed,
}

/// Reads `reader` line by line on a detached thread.
///
/// The thread is never joined: a blocked read on standard input cannot be
/// interrupted, and it ends with the process.
fn spawn_console<R>(reader: R) -> Result<Receiver<ConsoleInput>, ShutdownError>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name("console".to_owned())
        .spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if sender.send(ConsoleInput::Line(line)).is_err() {
                    return;
                }
            }
            let _ = sender.send(ConsoleInput::Closed);
        })
        .map_err(|source| ShutdownError::Console { source })?;
    Ok(receiver)
}

fn wait_for_console<F>(console: &Receiver<ConsoleInput>, mut pending_signal: F) -> ShutdownCause
where
    F: FnMut() -> Option<i32>,
{
    loop {
        if let Some(signal) = pending_signal() {
            return ShutdownCause::Signal(signal);
        }
        match console.recv_timeout(POLL_INTERVAL) {
            Ok(ConsoleInput::Line(line)) if line.starts_with(EXIT_KEYWORD) => {
                return ShutdownCause::ExitCommand;
            }
            Ok(ConsoleInput::Line(line)) => {
                debug!(target: PROCESS_TARGET, line, "ignoring console input");
            }
            Ok(ConsoleInput::Closed) | Err(RecvTimeoutError::Disconnected) => {
                return ShutdownCause::EndOfInput;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
