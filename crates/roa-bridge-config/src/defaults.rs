use std::time::Duration;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default deadline for one command round trip with the routing daemon.
pub const DEFAULT_DAEMON_TIMEOUT: Duration = Duration::from_millis(5_000);

/// First delay applied after a broken connection is re-established.
pub const DEFAULT_RECONNECT_INITIAL_BACKOFF: Duration = Duration::from_millis(10);

/// Upper bound for the exponential reconnect backoff.
pub const DEFAULT_RECONNECT_MAX_BACKOFF: Duration = Duration::from_millis(5_000);

/// Deadline for opening a TCP session with the RPKI cache.
pub const DEFAULT_FEED_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before the feed reconnects to the cache after a failure.
pub const DEFAULT_FEED_RETRY: Duration = Duration::from_secs(600);

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
