//! Resilient connection to the routing daemon's control socket.
//!
//! [`DaemonConnection`] owns at most one live stream. A round trip writes the
//! whole command and reads one bounded response chunk. When the peer has gone
//! away (broken pipe, connection reset or end of stream) the dead stream is
//! discarded, a new one is opened with capped exponential backoff, and the
//! identical command is sent again. Any other failure is surfaced for that
//! one command and the stream is discarded, so the next command starts from a
//! fresh session.

mod connector;

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use roa_bridge_config::ReconnectSettings;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use connector::{ConnectError, Connector, MAX_SOCKET_PATH_LEN, UnixConnector};

const CONNECTION_TARGET: &str = module_path!();

/// Bytes read for a single daemon response.
pub const RESPONSE_LIMIT: usize = 200;

/// Status prefix BIRD sends when a client connects.
const GREETING_CODE: &str = "0001";

const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Errors raised by a command round trip.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Writing the command failed.
    #[error("failed to send command: {source}")]
    Send {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Reading the response failed.
    #[error("failed to receive response: {source}")]
    Receive {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The reconnect attempt cap was reached.
    #[error("gave up reconnecting after {attempts} attempts: {source}")]
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
        /// Last connect failure.
        #[source]
        source: ConnectError,
    },
    /// Shutdown began while reconnecting.
    #[error("reconnect abandoned because the bridge is shutting down")]
    Cancelled,
}

/// Connection state as seen by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live stream.
    Disconnected,
    /// A stream is open.
    Connected,
}

/// Owner of the control-socket stream and its reconnect policy.
pub struct DaemonConnection<C: Connector> {
    connector: C,
    stream: Option<C::Stream>,
    policy: ReconnectSettings,
    cancel: Arc<AtomicBool>,
    reconnects: u64,
    quiet: bool,
}

impl<C: Connector> DaemonConnection<C> {
    /// Opens the initial connection.
    ///
    /// # Errors
    ///
    /// Returns the connect failure unchanged; startup treats it as fatal.
    pub fn open(connector: C, policy: ReconnectSettings) -> Result<Self, ConnectError> {
        let stream = establish(&connector)?;
        info!(
            target: CONNECTION_TARGET,
            endpoint = %connector.endpoint(),
            "connected to routing daemon"
        );
        Ok(Self {
            connector,
            stream: Some(stream),
            policy,
            cancel: Arc::new(AtomicBool::new(false)),
            reconnects: 0,
            quiet: false,
        })
    }

    /// Demotes connection-loss notices to debug level.
    #[must_use]
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Flag that aborts reconnect loops once set.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.stream.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Successful reconnects since the connection was opened.
    #[must_use]
    pub const fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Sends `command` and returns the daemon's status text.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError`] for non-recoverable IO failures, when the
    /// reconnect cap is hit, or when shutdown interrupts reconnecting.
    pub fn send_and_receive(&mut self, command: &str) -> Result<String, ExchangeError> {
        loop {
            let Some(stream) = self.stream.as_mut() else {
                self.reconnect()?;
                continue;
            };
            match round_trip(stream, command) {
                Ok(response) => return Ok(response),
                Err(failure) if failure.is_peer_gone() => {
                    if self.quiet {
                        debug!(
                            target: CONNECTION_TARGET,
                            error = %failure.error(),
                            "routing daemon connection lost; reconnecting"
                        );
                    } else {
                        warn!(
                            target: CONNECTION_TARGET,
                            endpoint = %self.connector.endpoint(),
                            error = %failure.error(),
                            "routing daemon connection lost; reconnecting"
                        );
                    }
                    self.stream = None;
                    self.reconnect()?;
                }
                Err(failure) => {
                    self.stream = None;
                    return Err(failure.into_exchange_error());
                }
            }
        }
    }

    /// Closes the stream. Further round trips reconnect first.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(
                target: CONNECTION_TARGET,
                endpoint = %self.connector.endpoint(),
                "closed routing daemon connection"
            );
        }
    }

    fn reconnect(&mut self) -> Result<(), ExchangeError> {
        let mut attempts: u32 = 0;
        let mut delay = self.policy.initial_backoff;
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(ExchangeError::Cancelled);
            }
            attempts = attempts.saturating_add(1);
            match establish(&self.connector) {
                Ok(stream) => {
                    self.stream = Some(stream);
                    self.reconnects = self.reconnects.saturating_add(1);
                    info!(
                        target: CONNECTION_TARGET,
                        endpoint = %self.connector.endpoint(),
                        attempts,
                        "reconnected to routing daemon"
                    );
                    return Ok(());
                }
                Err(source) => {
                    if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(ExchangeError::ReconnectExhausted { attempts, source });
                    }
                    warn!(
                        target: CONNECTION_TARGET,
                        error = %source,
                        attempts,
                        backoff_ms = delay.as_millis(),
                        "reconnect attempt failed"
                    );
                    self.pause(delay);
                    delay = delay.saturating_mul(2).min(self.policy.max_backoff);
                }
            }
        }
    }

    fn pause(&self, delay: Duration) {
        let mut remaining = delay;
        while !remaining.is_zero() && !self.cancel.load(Ordering::SeqCst) {
            let slice = remaining.min(CANCEL_POLL);
            thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}

/// Connects and consumes the daemon greeting so responses line up with commands.
fn establish<C: Connector>(connector: &C) -> Result<C::Stream, ConnectError> {
    let mut stream = connector.connect()?;
    let greeting = read_status(&mut stream).map_err(|source| ConnectError::Greeting {
        endpoint: connector.endpoint().to_string(),
        source,
    })?;
    if greeting.starts_with(GREETING_CODE) {
        debug!(target: CONNECTION_TARGET, %greeting, "daemon greeting received");
    } else {
        warn!(target: CONNECTION_TARGET, %greeting, "unexpected daemon greeting");
    }
    Ok(stream)
}

enum RoundTripFailure {
    Send(io::Error),
    Receive(io::Error),
}

impl RoundTripFailure {
    fn error(&self) -> &io::Error {
        match self {
            Self::Send(error) | Self::Receive(error) => error,
        }
    }

    fn is_peer_gone(&self) -> bool {
        matches!(
            self.error().kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof
        )
    }

    fn into_exchange_error(self) -> ExchangeError {
        match self {
            Self::Send(source) => ExchangeError::Send { source },
            Self::Receive(source) => ExchangeError::Receive { source },
        }
    }
}

fn round_trip<S: Read + Write>(stream: &mut S, command: &str) -> Result<String, RoundTripFailure> {
    stream
        .write_all(command.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(RoundTripFailure::Send)?;
    read_status(stream).map_err(RoundTripFailure::Receive)
}

/// Reads one bounded chunk; end of stream is reported as `UnexpectedEof`.
fn read_status<S: Read>(stream: &mut S) -> io::Result<String> {
    let mut buffer = vec![0_u8; RESPONSE_LIMIT];
    let read = stream.read(&mut buffer)?;
    if read == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "daemon closed the connection",
        ));
    }
    buffer.truncate(read);
    let text = String::from_utf8_lossy(&buffer);
    let status = text.split('\0').next().unwrap_or_default();
    Ok(status.trim_end_matches(['\r', '\n']).to_owned())
}
