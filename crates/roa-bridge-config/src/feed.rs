//! Validation feed endpoint settings.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Transport used to reach the RPKI cache.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum FeedTransportKind {
    /// Plain TCP.
    #[default]
    Tcp,
    /// SSH subsystem transport.
    Ssh,
}

/// Credentials for SSH-based feed transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCredentials {
    /// Remote user name.
    pub username: String,
    /// Known host key of the cache, if pinned.
    pub hostkey: Option<Utf8PathBuf>,
    /// Client private key used for public-key authentication.
    pub private_key: Utf8PathBuf,
    /// Client public key.
    pub public_key: Option<Utf8PathBuf>,
}

/// Resolved transport for the feed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTransport {
    /// Plain TCP.
    Tcp,
    /// SSH with the given credentials.
    Ssh(SshCredentials),
}

impl FeedTransport {
    /// Transport name as used in configuration.
    #[must_use]
    pub const fn kind(&self) -> FeedTransportKind {
        match self {
            Self::Tcp => FeedTransportKind::Tcp,
            Self::Ssh(_) => FeedTransportKind::Ssh,
        }
    }
}

/// Everything the feed adapter needs to reach the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) bind_address: Option<IpAddr>,
    pub(crate) transport: FeedTransport,
    pub(crate) connect_timeout: Duration,
    pub(crate) retry_interval: Duration,
}

impl FeedSettings {
    /// Cache host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Cache port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Local address the feed connection binds to, if any.
    #[must_use]
    pub const fn bind_address(&self) -> Option<IpAddr> {
        self.bind_address
    }

    /// Transport and credentials.
    #[must_use]
    pub const fn transport(&self) -> &FeedTransport {
        &self.transport
    }

    /// Deadline for establishing a cache session.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Delay before reconnecting after the cache session fails.
    #[must_use]
    pub const fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}

impl fmt::Display for FeedSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}://{}:{}",
            self.transport.kind(),
            self.host,
            self.port
        )
    }
}
