//! Validation of the layered [`Config`] into immutable [`BridgeSettings`].
//!
//! Loading is permissive: every key is optional so configuration files,
//! environment variables and flags can each contribute a subset. Resolving
//! enforces the required keys and the cross-field rules exactly once, before
//! any socket or file is touched.

use std::net::IpAddr;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::defaults::{
    DEFAULT_DAEMON_TIMEOUT, DEFAULT_FEED_CONNECT_TIMEOUT, DEFAULT_FEED_RETRY,
    DEFAULT_RECONNECT_INITIAL_BACKOFF, DEFAULT_RECONNECT_MAX_BACKOFF, default_log_filter,
    default_log_format,
};
use crate::family::{AddressFamilyFilter, FamilyFilterParseError};
use crate::feed::{FeedSettings, FeedTransport, FeedTransportKind, SshCredentials};
use crate::logging::LogFormat;
use crate::table::{TableName, TableNameError};
use crate::Config;

/// Errors reported while validating configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key was absent from every configuration layer.
    #[error("missing required setting '{key}'")]
    Missing {
        /// Configuration key.
        key: &'static str,
    },
    /// The feed port was zero.
    #[error("rtr_port must be between 1 and 65535")]
    InvalidPort,
    /// SSH transport selected without a user name.
    #[error("ssh transport requires 'ssh_username'")]
    MissingSshUsername,
    /// SSH transport selected without a private key.
    #[error("ssh transport requires 'ssh_private_key'")]
    MissingSshPrivateKey,
    /// The table name cannot be embedded in a command line.
    #[error("invalid roa_table: {0}")]
    Table(#[from] TableNameError),
    /// The family filter named no family.
    #[error("invalid ip_version: {0}")]
    FamilyFilter(#[from] FamilyFilterParseError),
    /// Backoff bounds were inverted.
    #[error(
        "reconnect_initial_backoff_ms ({initial_ms}) exceeds reconnect_max_backoff_ms ({max_ms})"
    )]
    InvertedBackoff {
        /// Configured initial backoff.
        initial_ms: u64,
        /// Configured maximum backoff.
        max_ms: u64,
    },
    /// The feed bind address is not an IP address.
    #[error("invalid rtr_bind_address '{value}'")]
    InvalidBindAddress {
        /// Configured value.
        value: String,
    },
    /// A zero round-trip deadline was configured.
    #[error("daemon_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

/// Reconnect policy applied when the routing daemon drops the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectSettings {
    /// Delay before the second reconnect attempt.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
    /// Optional cap on consecutive attempts; `None` retries until success.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_RECONNECT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_RECONNECT_MAX_BACKOFF,
            max_attempts: None,
        }
    }
}

/// Telemetry settings consumed by the subscriber installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    filter: String,
    format: LogFormat,
    file: Option<Utf8PathBuf>,
}

impl TelemetrySettings {
    /// Log filter expression.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Log file replacing stderr, if configured.
    #[must_use]
    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }
}

/// Validated, immutable settings for one bridge process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    daemon_socket: Utf8PathBuf,
    feed: FeedSettings,
    table: Option<TableName>,
    family_filter: AddressFamilyFilter,
    daemon: bool,
    pid_file: Option<Utf8PathBuf>,
    quiet: bool,
    telemetry: TelemetrySettings,
    daemon_timeout: Duration,
    reconnect: ReconnectSettings,
    max_command_len: Option<usize>,
}

impl BridgeSettings {
    /// Path of the routing daemon's control socket.
    #[must_use]
    pub fn daemon_socket(&self) -> &Utf8Path {
        &self.daemon_socket
    }

    /// Validation feed endpoint.
    #[must_use]
    pub const fn feed(&self) -> &FeedSettings {
        &self.feed
    }

    /// Optional ROA table qualifier.
    #[must_use]
    pub const fn table(&self) -> Option<&TableName> {
        self.table.as_ref()
    }

    /// Families forwarded to the daemon.
    #[must_use]
    pub const fn family_filter(&self) -> AddressFamilyFilter {
        self.family_filter
    }

    /// Whether the process detaches into the background.
    #[must_use]
    pub const fn daemon(&self) -> bool {
        self.daemon
    }

    /// PID/lock file used in background mode.
    #[must_use]
    pub fn pid_file(&self) -> Option<&Utf8Path> {
        self.pid_file.as_deref()
    }

    /// Whether informational logs are suppressed.
    #[must_use]
    pub const fn quiet(&self) -> bool {
        self.quiet
    }

    /// Telemetry settings.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    /// Deadline for a single send or receive on the daemon socket.
    #[must_use]
    pub const fn daemon_timeout(&self) -> Duration {
        self.daemon_timeout
    }

    /// Reconnect policy.
    #[must_use]
    pub const fn reconnect(&self) -> ReconnectSettings {
        self.reconnect
    }

    /// Operator cap on the rendered command length.
    #[must_use]
    pub const fn max_command_len(&self) -> Option<usize> {
        self.max_command_len
    }
}

impl Config {
    /// Validates the loaded layers into [`BridgeSettings`].
    pub fn resolve(&self) -> Result<BridgeSettings, ConfigError> {
        let daemon_socket = self
            .bird_socket
            .clone()
            .ok_or(ConfigError::Missing { key: "bird_socket" })?;
        let feed = self.resolve_feed()?;
        let table = self
            .roa_table
            .as_deref()
            .map(str::parse::<TableName>)
            .transpose()?;
        let family_filter = self
            .ip_version
            .as_deref()
            .map(str::parse::<AddressFamilyFilter>)
            .transpose()?
            .unwrap_or_default();
        let daemon_timeout = match self.daemon_timeout_ms {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(millis) => Duration::from_millis(millis),
            None => DEFAULT_DAEMON_TIMEOUT,
        };

        Ok(BridgeSettings {
            daemon_socket,
            feed,
            table,
            family_filter,
            daemon: self.daemon.unwrap_or(false),
            pid_file: self.pid_file.clone(),
            quiet: self.quiet.unwrap_or(false),
            telemetry: TelemetrySettings {
                filter: self
                    .log_filter
                    .clone()
                    .unwrap_or_else(|| default_log_filter().to_owned()),
                format: self.log_format.unwrap_or_else(default_log_format),
                file: self.log_file.clone(),
            },
            daemon_timeout,
            reconnect: self.resolve_reconnect()?,
            max_command_len: self.max_command_len,
        })
    }

    fn resolve_feed(&self) -> Result<FeedSettings, ConfigError> {
        let host = self
            .rtr_host
            .clone()
            .ok_or(ConfigError::Missing { key: "rtr_host" })?;
        let port = match self.rtr_port {
            Some(0) => return Err(ConfigError::InvalidPort),
            Some(port) => port,
            None => return Err(ConfigError::Missing { key: "rtr_port" }),
        };
        let transport = match self.rtr_transport.unwrap_or_default() {
            FeedTransportKind::Tcp => FeedTransport::Tcp,
            FeedTransportKind::Ssh => FeedTransport::Ssh(SshCredentials {
                username: self
                    .ssh_username
                    .clone()
                    .ok_or(ConfigError::MissingSshUsername)?,
                hostkey: self.ssh_hostkey.clone(),
                private_key: self
                    .ssh_private_key
                    .clone()
                    .ok_or(ConfigError::MissingSshPrivateKey)?,
                public_key: self.ssh_public_key.clone(),
            }),
        };
        let bind_address = self
            .rtr_bind_address
            .as_deref()
            .map(|value| {
                value
                    .parse::<IpAddr>()
                    .map_err(|_| ConfigError::InvalidBindAddress {
                        value: value.to_owned(),
                    })
            })
            .transpose()?;
        Ok(FeedSettings {
            host,
            port,
            bind_address,
            transport,
            connect_timeout: self
                .feed_connect_timeout_secs
                .map_or(DEFAULT_FEED_CONNECT_TIMEOUT, Duration::from_secs),
            retry_interval: self
                .feed_retry_secs
                .map_or(DEFAULT_FEED_RETRY, Duration::from_secs),
        })
    }

    fn resolve_reconnect(&self) -> Result<ReconnectSettings, ConfigError> {
        let defaults = ReconnectSettings::default();
        let initial_backoff = self
            .reconnect_initial_backoff_ms
            .map_or(defaults.initial_backoff, Duration::from_millis);
        let max_backoff = self
            .reconnect_max_backoff_ms
            .map_or(defaults.max_backoff, Duration::from_millis);
        if initial_backoff > max_backoff {
            return Err(ConfigError::InvertedBackoff {
                initial_ms: duration_millis(initial_backoff),
                max_ms: duration_millis(max_backoff),
            });
        }
        Ok(ReconnectSettings {
            initial_backoff,
            max_backoff,
            max_attempts: self.reconnect_max_attempts,
        })
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
