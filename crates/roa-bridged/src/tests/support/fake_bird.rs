//! In-process stand-in for BIRD's control socket.
//!
//! The fake greets every client with `0001`, records each command line and
//! answers from a script, falling back to `0000` once the script runs dry.
//! Connections are served one at a time, which matches a bridge that holds
//! a single stream.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

const GREETING: &[u8] = b"0001 BIRD 2.0.12 ready.\n";
const ACCEPTED: &[u8] = b"0000 \n";
const POLL: Duration = Duration::from_millis(10);

/// Scripted answer to the next command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeReply {
    /// Acknowledge with `0000`.
    Accept,
    /// Answer with the given status line.
    Reject(&'static str),
    /// Read the command, then close the connection without answering.
    Hangup,
    /// Stop accepting connections, then hang up.
    Vanish,
}

#[derive(Default)]
struct Recorded {
    script: VecDeque<FakeReply>,
    received: Vec<String>,
    connections: usize,
}

struct Shared {
    path: Utf8PathBuf,
    recorded: Mutex<Recorded>,
    accepting: AtomicBool,
    running: AtomicBool,
}

impl Shared {
    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().expect("fake bird mutex poisoned")
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Fake control socket bound inside a temporary directory.
pub struct FakeBird {
    _dir: TempDir,
    path: Utf8PathBuf,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl FakeBird {
    /// Binds the socket and starts serving.
    pub fn start() -> Self {
        let dir = TempDir::new().expect("create socket directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("bird.ctl"))
            .expect("temporary path is UTF-8");
        Self::start_at(dir, path)
    }

    /// Binds the socket at `path`, keeping `dir` alive for the fake's lifetime.
    pub fn start_at(dir: TempDir, path: Utf8PathBuf) -> Self {
        let listener = UnixListener::bind(&path).expect("bind fake bird socket");
        listener
            .set_nonblocking(true)
            .expect("make fake bird listener non-blocking");
        let shared = Arc::new(Shared {
            path: path.clone(),
            recorded: Mutex::new(Recorded::default()),
            accepting: AtomicBool::new(true),
            running: AtomicBool::new(true),
        });
        let worker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || serve(&listener, &shared))
        };
        Self {
            _dir: dir,
            path,
            shared,
            worker: Some(worker),
        }
    }

    /// Path clients connect to.
    pub fn socket_path(&self) -> &Utf8Path {
        &self.path
    }

    /// Queues replies for upcoming commands.
    pub fn script(&self, replies: impl IntoIterator<Item = FakeReply>) {
        self.shared.recorded().script.extend(replies);
    }

    /// Command lines received so far, without terminators.
    pub fn received(&self) -> Vec<String> {
        self.shared.recorded().received.clone()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.shared.recorded().connections
    }

    /// Unlinks the socket so new connects fail; the current client is still served.
    pub fn stop_accepting(&self) {
        self.shared.stop_accepting();
    }
}

impl Drop for FakeBird {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(listener: &UnixListener, shared: &Shared) {
    while shared.running() {
        if !shared.accepting.load(Ordering::SeqCst) {
            thread::sleep(POLL);
            continue;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                shared.recorded().connections += 1;
                let _ = handle_client(stream, shared);
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => thread::sleep(POLL),
            Err(_) => return,
        }
    }
}

fn handle_client(stream: UnixStream, shared: &Shared) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL))?;
    let mut writer = stream.try_clone()?;
    writer.write_all(GREETING)?;
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    while shared.running() {
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(()),
            Ok(_) if !line.ends_with('\n') => {}
            Ok(_) => {
                let reply = {
                    let mut recorded = shared.recorded();
                    recorded.received.push(line.trim_end().to_owned());
                    recorded.script.pop_front().unwrap_or(FakeReply::Accept)
                };
                line.clear();
                match reply {
                    FakeReply::Accept => writer.write_all(ACCEPTED)?,
                    FakeReply::Reject(status) => writer.write_all(format!("{status}\n").as_bytes())?,
                    FakeReply::Hangup => return Ok(()),
                    FakeReply::Vanish => {
                        shared.stop_accepting();
                        return Ok(());
                    }
                }
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}
