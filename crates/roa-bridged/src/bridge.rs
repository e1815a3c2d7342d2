//! The feed's sink: filters, formats and forwards updates to the daemon.
//!
//! The connection and the formatter live behind one mutex. Feed callbacks
//! hold it for a full round trip, and [`UpdateBridge::close`] takes the same
//! lock, so shutdown never closes a stream that a callback is still using.
//! A separate atomic flag, raised by [`UpdateBridge::begin_close`], interrupts
//! a reconnect loop that would otherwise keep the lock while the daemon is
//! down. Shutdown raises it before joining the feed thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roa_bridge_config::{AddressFamilyFilter, BridgeSettings, TableName};
use tracing::{debug, error, info};

use crate::command::{CommandFormatter, FormatError};
use crate::connection::{Connector, DaemonConnection};
use crate::event::ValidationEvent;
use crate::feed::EventSink;
use crate::stats::{BridgeStats, StatsSnapshot};

const BRIDGE_TARGET: &str = module_path!();

/// Status codes BIRD uses for "OK" and for its connection greeting.
const SUCCESS_CODES: [&str; 2] = ["0000", "0001"];

/// Shared handle threaded through feed registration and shutdown.
pub type BridgeContext<C> = Arc<UpdateBridge<C>>;

/// What happened to a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The family filter excluded the event.
    Filtered,
    /// The command did not fit the budget.
    TooLong(FormatError),
    /// The daemon acknowledged the command.
    Accepted(String),
    /// The daemon answered with a failure status.
    Rejected(String),
    /// The round trip failed.
    Failed,
    /// The bridge was already closed.
    Closed,
}

struct BridgeState<C: Connector> {
    formatter: CommandFormatter,
    connection: Option<DaemonConnection<C>>,
}

/// Forwards validation events to the routing daemon.
pub struct UpdateBridge<C: Connector> {
    state: Mutex<BridgeState<C>>,
    filter: AddressFamilyFilter,
    quiet: bool,
    closing: Arc<AtomicBool>,
    stats: BridgeStats,
}

impl<C: Connector> UpdateBridge<C> {
    /// Builds a bridge over an open connection.
    #[must_use]
    pub fn new(
        connection: DaemonConnection<C>,
        formatter: CommandFormatter,
        filter: AddressFamilyFilter,
        quiet: bool,
    ) -> Self {
        let closing = connection.cancel_flag();
        Self {
            state: Mutex::new(BridgeState {
                formatter,
                connection: Some(connection),
            }),
            filter,
            quiet,
            closing,
            stats: BridgeStats::default(),
        }
    }

    /// Builds a bridge configured from resolved settings.
    #[must_use]
    pub fn from_settings(connection: DaemonConnection<C>, settings: &BridgeSettings) -> Self {
        let formatter = CommandFormatter::new(settings.table(), settings.max_command_len());
        Self::new(
            connection.with_quiet(settings.quiet()),
            formatter,
            settings.family_filter(),
            settings.quiet(),
        )
    }

    /// Filters, formats and sends one event.
    #[must_use]
    pub fn deliver(&self, event: &ValidationEvent) -> Delivery {
        self.stats.record_dispatched();
        if !self.filter.allows(event.family()) {
            self.stats.record_filtered();
            return Delivery::Filtered;
        }
        if self.closing.load(Ordering::SeqCst) {
            self.stats.record_dropped();
            debug!(target: BRIDGE_TARGET, ?event, "bridge closed; update dropped");
            return Delivery::Closed;
        }

        let mut state = self.lock_state();
        let BridgeState {
            formatter,
            connection,
        } = &mut *state;
        let Some(connection) = connection.as_mut() else {
            self.stats.record_dropped();
            return Delivery::Closed;
        };
        let command = match formatter.format(event) {
            Ok(command) => command,
            Err(format_error) => {
                self.stats.record_dropped();
                error!(
                    target: BRIDGE_TARGET,
                    ?event,
                    error = %format_error,
                    "update does not fit the command buffer; dropped"
                );
                return Delivery::TooLong(format_error);
            }
        };

        let outcome = connection.send_and_receive(command);
        self.stats.set_reconnects(connection.reconnects());
        let command = command.trim_end();
        match outcome {
            Ok(response) if is_success(&response) => {
                self.stats.record_accepted();
                if !self.quiet {
                    info!(
                        target: BRIDGE_TARGET,
                        command,
                        response = %response,
                        "routing daemon accepted update"
                    );
                }
                Delivery::Accepted(response)
            }
            Ok(response) => {
                self.stats.record_rejected();
                error!(
                    target: BRIDGE_TARGET,
                    command,
                    response = %response,
                    "routing daemon rejected update"
                );
                Delivery::Rejected(response)
            }
            Err(exchange_error) => {
                self.stats.record_dropped();
                error!(
                    target: BRIDGE_TARGET,
                    command,
                    error = %exchange_error,
                    "failed to deliver update"
                );
                Delivery::Failed
            }
        }
    }

    /// Replaces the table clause used for subsequent commands.
    pub fn set_table(&self, table: Option<&TableName>) {
        self.lock_state().formatter.set_table(table);
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops accepting events and abandons any reconnect in progress.
    ///
    /// Does not wait for an in-flight round trip; [`Self::close`] does.
    pub fn begin_close(&self) {
        if !self.closing.swap(true, Ordering::SeqCst) {
            debug!(target: BRIDGE_TARGET, "update bridge closing");
        }
    }

    /// Closes the daemon connection once any in-flight round trip finishes.
    ///
    /// Later events are dropped. Calling `close` again only returns the totals.
    pub fn close(&self) -> StatsSnapshot {
        self.begin_close();
        let mut state = self.lock_state();
        if let Some(mut connection) = state.connection.take() {
            connection.close();
            let totals = self.stats.snapshot();
            info!(
                target: BRIDGE_TARGET,
                dispatched = totals.dispatched,
                filtered = totals.filtered,
                accepted = totals.accepted,
                rejected = totals.rejected,
                dropped = totals.dropped,
                reconnects = totals.reconnects,
                "update bridge closed"
            );
        }
        drop(state);
        self.stats.snapshot()
    }

    fn lock_state(&self) -> MutexGuard<'_, BridgeState<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector> EventSink for UpdateBridge<C> {
    fn on_event(&self, event: ValidationEvent) {
        // Outcomes are already logged and counted.
        let _delivery = self.deliver(&event);
    }
}

fn is_success(response: &str) -> bool {
    SUCCESS_CODES.iter().any(|code| response.starts_with(code))
}
