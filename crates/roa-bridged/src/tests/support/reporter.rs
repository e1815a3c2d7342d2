//! Test double for [`HealthReporter`] that records structured events for assertions.

use std::sync::Mutex;

use camino::Utf8Path;
use roa_bridge_config::{BridgeSettings, FeedSettings};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::process::{LaunchError, ShutdownCause};
use crate::stats::StatsSnapshot;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The control socket connection was established.
    DaemonConnected,
    /// The feed started.
    FeedStarted,
    /// Launch failed after bootstrap.
    LaunchFailed(String),
    /// Shutdown began.
    ShutdownRequested(ShutdownCause),
    /// Shutdown finished with the given totals.
    ShutdownCompleted(StatsSnapshot),
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Returns `true` once `event` has been recorded.
    pub fn saw(&self, event: &HealthEvent) -> bool {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .contains(event)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _settings: &BridgeSettings) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn daemon_connected(&self, _socket: &Utf8Path) {
        self.record(HealthEvent::DaemonConnected);
    }

    fn feed_started(&self, _feed: &FeedSettings) {
        self.record(HealthEvent::FeedStarted);
    }

    fn launch_failed(&self, error: &LaunchError) {
        self.record(HealthEvent::LaunchFailed(error.to_string()));
    }

    fn shutdown_requested(&self, cause: ShutdownCause) {
        self.record(HealthEvent::ShutdownRequested(cause));
    }

    fn shutdown_completed(&self, totals: &StatsSnapshot) {
        self.record(HealthEvent::ShutdownCompleted(*totals));
    }
}
