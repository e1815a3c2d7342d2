//! Defines the unified error surface for bridge launch and supervision.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::connection::ConnectError;
use crate::feed::FeedError;

use super::daemonizer::DaemonizeError;
use super::shutdown::ShutdownError;

/// Errors surfaced while launching or supervising the bridge process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the bridge failed.
    #[error("bridge bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Daemonisation failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[source]
        source: DaemonizeError,
    },
    /// The PID file could not be opened.
    #[error("failed to open pid file '{path}': {source}")]
    PidFileOpen {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Another bridge holds the PID file lock.
    #[error("bridge already running (pid file '{path}', pid {})", display_pid(.pid))]
    AlreadyRunning {
        /// PID file path.
        path: Utf8PathBuf,
        /// PID recorded by the running instance, when readable.
        pid: Option<u32>,
    },
    /// Writing the PID file failed.
    #[error("failed to write pid file '{path}': {source}")]
    PidWrite {
        /// PID file path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Signal handlers could not be installed or shutdown could not be awaited.
    #[error("failed to await shutdown: {source}")]
    Shutdown {
        /// Underlying shutdown error.
        #[source]
        source: ShutdownError,
    },
    /// The routing daemon's control socket was unreachable.
    #[error("failed to connect to routing daemon: {source}")]
    Connect {
        /// Underlying connection error.
        #[source]
        source: ConnectError,
    },
    /// The validation feed could not be created or started.
    #[error("failed to start validation feed: {source}")]
    Feed {
        /// Underlying feed error.
        #[source]
        source: FeedError,
    },
}

fn display_pid(pid: &Option<u32>) -> String {
    pid.map_or_else(|| "unknown".to_owned(), |pid| pid.to_string())
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<DaemonizeError> for LaunchError {
    fn from(source: DaemonizeError) -> Self {
        Self::Daemonize { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

impl From<ConnectError> for LaunchError {
    fn from(source: ConnectError) -> Self {
        Self::Connect { source }
    }
}

impl From<FeedError> for LaunchError {
    fn from(source: FeedError) -> Self {
        Self::Feed { source }
    }
}
