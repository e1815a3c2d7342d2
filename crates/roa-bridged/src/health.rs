//! Structured health reporting for bridge lifecycle events.

use std::sync::Arc;

use camino::Utf8Path;
use roa_bridge_config::{BridgeSettings, FeedSettings};

use crate::bootstrap::BootstrapError;
use crate::process::{LaunchError, ShutdownCause};
use crate::stats::StatsSnapshot;

const HEALTH_TARGET: &str = module_path!();

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once settings are resolved and telemetry is running.
    fn bootstrap_succeeded(&self, settings: &BridgeSettings);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after the control socket connection is established.
    fn daemon_connected(&self, socket: &Utf8Path);

    /// Invoked after the validation feed has started.
    fn feed_started(&self, feed: &FeedSettings);

    /// Invoked when launch fails after bootstrap.
    fn launch_failed(&self, error: &LaunchError);

    /// Invoked when shutdown begins.
    fn shutdown_requested(&self, cause: ShutdownCause);

    /// Invoked after the feed is stopped and the connection closed.
    fn shutdown_completed(&self, totals: &StatsSnapshot);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, settings: &BridgeSettings) {
        (**self).bootstrap_succeeded(settings);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn daemon_connected(&self, socket: &Utf8Path) {
        (**self).daemon_connected(socket);
    }

    fn feed_started(&self, feed: &FeedSettings) {
        (**self).feed_started(feed);
    }

    fn launch_failed(&self, error: &LaunchError) {
        (**self).launch_failed(error);
    }

    fn shutdown_requested(&self, cause: ShutdownCause) {
        (**self).shutdown_requested(cause);
    }

    fn shutdown_completed(&self, totals: &StatsSnapshot) {
        (**self).shutdown_completed(totals);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, settings: &BridgeSettings) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %settings.daemon_socket(),
            feed = %settings.feed(),
            families = %settings.family_filter(),
            table = settings.table().map(|table| table.as_str()),
            daemon = settings.daemon(),
            log_filter = %settings.telemetry().filter(),
            log_format = %settings.telemetry().format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn daemon_connected(&self, socket: &Utf8Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "daemon_connected",
            socket = %socket,
            "connected to routing daemon"
        );
    }

    fn feed_started(&self, feed: &FeedSettings) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "feed_started",
            cache = %feed,
            "validation feed running"
        );
    }

    fn launch_failed(&self, error: &LaunchError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "launch_failed",
            error = %error,
            "bridge failed to start"
        );
    }

    fn shutdown_requested(&self, cause: ShutdownCause) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_requested",
            cause = %cause,
            "shutting down bridge"
        );
    }

    fn shutdown_completed(&self, totals: &StatsSnapshot) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            dispatched = totals.dispatched,
            accepted = totals.accepted,
            rejected = totals.rejected,
            dropped = totals.dropped,
            "bridge stopped"
        );
    }
}
