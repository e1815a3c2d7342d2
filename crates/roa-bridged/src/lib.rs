//! Bridge between an RPKI validation feed and BIRD's ROA tables.
//!
//! The bridge keeps an RTR session to an RPKI cache and turns every change in
//! the validated route-origin set into an `add roa` or `delete roa` command on
//! BIRD's control socket. The pieces are:
//!
//! - [`feed`] receives validation events from the cache on its own thread.
//! - [`bridge`] filters each event by address family, renders it with the
//!   [`command`] formatter and sends it over a [`connection`] that reconnects
//!   and resends when BIRD restarts.
//! - The process controller sequences startup (bootstrap, daemonising, the
//!   PID lock, signal handlers) and tears everything down in reverse order.
//!
//! Health reporting hooks emit structured telemetry at each lifecycle stage so
//! operators can follow a bridge from start to shutdown.

mod bootstrap;
pub mod bridge;
pub mod command;
pub mod connection;
pub mod event;
pub mod feed;
mod health;
mod process;
pub mod stats;
mod telemetry;

pub use bootstrap::{Bootstrap, BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    DaemonizeError, Daemonizer, LaunchError, LaunchMode, ShutdownCause, ShutdownError,
    ShutdownSignal, SystemDaemonizer, SystemShutdownSignal, run_bridge,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
