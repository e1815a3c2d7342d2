//! Shared configuration for the RPKI-to-BIRD ROA bridge.
//!
//! [`Config`] is loaded in layers through `ortho_config`: an optional TOML
//! file (`--config-path`), environment variables prefixed with
//! `ROA_BRIDGE_`, and command-line flags, in increasing precedence. Every key
//! is optional at this stage; [`Config::resolve`] then checks the required
//! keys and produces the immutable [`BridgeSettings`] the bridge runs on.

mod defaults;
mod family;
mod feed;
mod logging;
mod settings;
mod table;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_DAEMON_TIMEOUT, DEFAULT_FEED_CONNECT_TIMEOUT, DEFAULT_FEED_RETRY, DEFAULT_LOG_FILTER,
    DEFAULT_RECONNECT_INITIAL_BACKOFF, DEFAULT_RECONNECT_MAX_BACKOFF, default_log_filter,
    default_log_format,
};
pub use family::{AddressFamily, AddressFamilyFilter, FamilyFilterParseError};
pub use feed::{FeedSettings, FeedTransport, FeedTransportKind, SshCredentials};
pub use logging::{LogFormat, LogFormatParseError};
pub use settings::{BridgeSettings, ConfigError, ReconnectSettings, TelemetrySettings};
pub use table::{TableName, TableNameError};

/// Layered configuration as loaded from files, environment and flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "ROA_BRIDGE")]
pub struct Config {
    /// Path to the BIRD control socket.
    pub bird_socket: Option<Utf8PathBuf>,
    /// Host name or address of the RPKI cache.
    pub rtr_host: Option<String>,
    /// Port of the RPKI cache.
    pub rtr_port: Option<u16>,
    /// Transport used to reach the cache (`tcp` or `ssh`).
    pub rtr_transport: Option<FeedTransportKind>,
    /// Local address the cache connection binds to.
    pub rtr_bind_address: Option<String>,
    /// SSH user name.
    pub ssh_username: Option<String>,
    /// Pinned SSH host key of the cache.
    pub ssh_hostkey: Option<Utf8PathBuf>,
    /// SSH private key.
    pub ssh_private_key: Option<Utf8PathBuf>,
    /// SSH public key.
    pub ssh_public_key: Option<Utf8PathBuf>,
    /// ROA table the commands target.
    pub roa_table: Option<String>,
    /// Address families forwarded to BIRD (`4`, `6`, `46`, `all`).
    pub ip_version: Option<String>,
    /// Detach into the background.
    pub daemon: Option<bool>,
    /// PID/lock file written in background mode.
    pub pid_file: Option<Utf8PathBuf>,
    /// Suppress informational logs.
    pub quiet: Option<bool>,
    /// Log filter expression.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Log file used instead of stderr.
    pub log_file: Option<Utf8PathBuf>,
    /// Deadline for one command round trip, in milliseconds.
    pub daemon_timeout_ms: Option<u64>,
    /// First reconnect backoff, in milliseconds.
    pub reconnect_initial_backoff_ms: Option<u64>,
    /// Reconnect backoff ceiling, in milliseconds.
    pub reconnect_max_backoff_ms: Option<u64>,
    /// Consecutive reconnect attempts before an update is dropped.
    pub reconnect_max_attempts: Option<u32>,
    /// Deadline for connecting to the cache, in seconds.
    pub feed_connect_timeout_secs: Option<u64>,
    /// Delay before reconnecting to the cache.
    pub feed_retry_secs: Option<u64>,
    /// Upper bound on the rendered command length.
    pub max_command_len: Option<usize>,
}
