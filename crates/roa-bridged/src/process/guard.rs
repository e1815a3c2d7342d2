//! Exclusive PID file held for the lifetime of a background bridge.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;

use camino::{Utf8Path, Utf8PathBuf};
use nix::fcntl::{Flock, FlockArg};
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Holds an advisory lock on the PID file and removes it on drop.
pub(crate) struct PidFileGuard {
    path: Utf8PathBuf,
    _lock: Flock<File>,
}

impl PidFileGuard {
    /// Opens or creates `path`, locks it and records `pid`.
    ///
    /// The file is only truncated once the lock is held, so a refused start
    /// leaves the running bridge's PID in place.
    pub(crate) fn acquire(path: &Utf8Path, pid: u32) -> Result<Self, LaunchError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o640)
            .open(path)
            .map_err(|source| LaunchError::PidFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        let mut lock = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => lock,
            Err((mut file, errno)) => {
                let holder = read_pid(&mut file);
                info!(
                    target: PROCESS_TARGET,
                    file = %path,
                    holder,
                    error = %errno,
                    "refusing to start: pid file is locked"
                );
                return Err(LaunchError::AlreadyRunning {
                    path: path.to_path_buf(),
                    pid: holder,
                });
            }
        };
        let write_error = |source: io::Error| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        };
        lock.set_len(0).map_err(write_error)?;
        writeln!(lock, "{pid}").map_err(write_error)?;
        lock.sync_all().map_err(write_error)?;
        info!(target: PROCESS_TARGET, pid, file = %path, "pid file written");
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path,
                    error = %error,
                    "failed to remove pid file"
                );
            }
            _ => {}
        }
    }
}

fn read_pid(file: &mut File) -> Option<u32> {
    let mut content = String::new();
    file.read_to_string(&mut content).ok()?;
    content.trim().parse().ok()
}
