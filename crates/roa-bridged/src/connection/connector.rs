//! Opens stream connections to the routing daemon's control socket.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;
use std::{fmt, io};

use camino::{Utf8Path, Utf8PathBuf};
use socket2::{Domain, SockAddr, Socket, Type};
use thiserror::Error;

/// Longest path that fits `sun_path` together with its terminator.
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Errors raised while establishing a control-socket connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The socket path cannot be stored in a Unix socket address.
    #[error("socket path '{path}' is longer than {max} bytes")]
    PathTooLong {
        /// Offending path.
        path: Utf8PathBuf,
        /// Longest accepted path.
        max: usize,
    },
    /// The socket descriptor could not be created or configured.
    #[error("failed to create socket for '{path}': {source}")]
    SocketCreateFailed {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// Connecting to the daemon failed.
    #[error("failed to connect to '{path}': {source}")]
    ConnectFailed {
        /// Target path.
        path: Utf8PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The daemon accepted the connection but sent no greeting.
    #[error("no greeting from '{endpoint}': {source}")]
    Greeting {
        /// Endpoint description.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Source of fresh daemon connections.
pub trait Connector: Send {
    /// Stream produced by a successful connect.
    type Stream: Read + Write + Send;

    /// Opens a new connection.
    fn connect(&self) -> Result<Self::Stream, ConnectError>;

    /// Human-readable endpoint, used in logs.
    fn endpoint(&self) -> &dyn fmt::Display;
}

/// Connects to a Unix domain stream socket with per-operation deadlines.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: Utf8PathBuf,
    timeout: Duration,
}

impl UnixConnector {
    /// Builds a connector for `path`; `timeout` bounds connect, send and receive.
    #[must_use]
    pub fn new(path: &Utf8Path, timeout: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            timeout,
        }
    }

    fn create_failed(&self, source: io::Error) -> ConnectError {
        ConnectError::SocketCreateFailed {
            path: self.path.clone(),
            source,
        }
    }
}

impl Connector for UnixConnector {
    type Stream = UnixStream;

    fn connect(&self) -> Result<UnixStream, ConnectError> {
        if self.path.as_str().len() > MAX_SOCKET_PATH_LEN {
            return Err(ConnectError::PathTooLong {
                path: self.path.clone(),
                max: MAX_SOCKET_PATH_LEN,
            });
        }
        let socket =
            Socket::new(Domain::UNIX, Type::STREAM, None).map_err(|e| self.create_failed(e))?;
        let address = SockAddr::unix(self.path.as_std_path()).map_err(|e| self.create_failed(e))?;
        socket
            .connect_timeout(&address, self.timeout)
            .map_err(|source| ConnectError::ConnectFailed {
                path: self.path.clone(),
                source,
            })?;
        socket
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| self.create_failed(e))?;
        socket
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| self.create_failed(e))?;
        Ok(socket.into())
    }

    fn endpoint(&self) -> &dyn fmt::Display {
        &self.path
    }
}
