//! Supervises bridge launch sequencing and runtime orchestration.

use std::io::{self, Write};
use std::sync::Arc;

use roa_bridge_config::BridgeSettings;
use tracing::{info, warn};

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::bridge::{BridgeContext, UpdateBridge};
use crate::connection::{DaemonConnection, UnixConnector};
use crate::feed::{EventSink, FeedFactory, RtrFeedFactory, ValidationFeed};
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::daemonizer::{Daemonizer, SystemDaemonizer};
use super::errors::LaunchError;
use super::guard::PidFileGuard;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Launch mode for the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal and accept `exit` on standard input.
    Foreground,
}

impl LaunchMode {
    /// Picks the mode requested by the `daemon` setting.
    #[must_use]
    pub const fn from_settings(settings: &BridgeSettings) -> Self {
        if settings.daemon() {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// Process-level collaborators needed to control the bridge lifecycle.
pub(crate) struct ProcessControl<D, S> {
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Service dependencies required to construct the bridge runtime.
pub(crate) struct ServiceDeps<L, F> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) feeds: F,
}

/// Collaborators required to launch the bridge runtime.
pub(crate) struct LaunchPlan<L, D, S, F> {
    pub(crate) process: ProcessControl<D, S>,
    pub(crate) services: ServiceDeps<L, F>,
}

/// Runs the bridge using the production collaborators.
pub fn run_bridge() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        process: ProcessControl {
            daemonizer: SystemDaemonizer::new(),
            shutdown: SystemShutdownSignal::new(),
        },
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            feeds: RtrFeedFactory,
        },
    };
    run_bridge_with(plan)
}

/// Runs the bridge with injected collaborators.
pub(crate) fn run_bridge_with<L, D, S, F>(plan: LaunchPlan<L, D, S, F>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
    F: FeedFactory,
{
    let LaunchPlan { process, services } = plan;
    let ServiceDeps {
        loader,
        reporter,
        feeds,
    } = services;

    let settings = bootstrap_with(&loader, reporter.as_ref())?.into_settings();
    let mode = LaunchMode::from_settings(&settings);
    info!(target: PROCESS_TARGET, ?mode, "starting bridge runtime");
    let result = supervise(&settings, mode, &process, reporter.as_ref(), &feeds);
    if let Err(error) = &result {
        reporter.launch_failed(error);
    }
    result
}

fn supervise<D, S, F>(
    settings: &BridgeSettings,
    mode: LaunchMode,
    process: &ProcessControl<D, S>,
    reporter: &dyn HealthReporter,
    feeds: &F,
) -> Result<(), LaunchError>
where
    D: Daemonizer,
    S: ShutdownSignal,
    F: FeedFactory,
{
    if mode == LaunchMode::Background {
        process.daemonizer.daemonize()?;
    }
    let _pid_guard = match (mode, settings.pid_file()) {
        (LaunchMode::Background, Some(path)) => {
            Some(PidFileGuard::acquire(path, std::process::id())?)
        }
        _ => None,
    };
    process.shutdown.install()?;

    let connector = UnixConnector::new(settings.daemon_socket(), settings.daemon_timeout());
    let connection = DaemonConnection::open(connector, settings.reconnect())?;
    reporter.daemon_connected(settings.daemon_socket());

    let bridge: BridgeContext<UnixConnector> =
        Arc::new(UpdateBridge::from_settings(connection, settings));
    let sink: Arc<dyn EventSink> = Arc::clone(&bridge) as Arc<dyn EventSink>;
    let mut feed = feeds.create(settings.feed(), sink)?;
    let outcome = run_feed(settings, mode, &mut feed, &process.shutdown, reporter);

    // A callback may be stuck reconnecting, so abandon that before joining
    // the feed thread, then close the connection once the feed is quiet.
    bridge.begin_close();
    feed.stop();
    let totals = bridge.close();
    outcome?;
    reporter.shutdown_completed(&totals);
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

fn run_feed<V, S>(
    settings: &BridgeSettings,
    mode: LaunchMode,
    feed: &mut V,
    shutdown: &S,
    reporter: &dyn HealthReporter,
) -> Result<(), LaunchError>
where
    V: ValidationFeed,
    S: ShutdownSignal,
{
    feed.start()?;
    reporter.feed_started(settings.feed());

    if mode == LaunchMode::Foreground {
        announce_ready(settings);
    }

    let cause = shutdown.wait(mode)?;
    reporter.shutdown_requested(cause);
    Ok(())
}

fn announce_ready(settings: &BridgeSettings) {
    let feed = settings.feed();
    let mut stdout = io::stdout().lock();
    let written = writeln!(
        stdout,
        "{} connected to {}:{} ready for IP versions {}.\nType 'exit' to clean up and quit.",
        env!("CARGO_PKG_NAME"),
        feed.host(),
        feed.port(),
        settings.family_filter(),
    )
    .and_then(|()| stdout.flush());
    if let Err(error) = written {
        warn!(target: PROCESS_TARGET, %error, "failed to print console banner");
    }
}
