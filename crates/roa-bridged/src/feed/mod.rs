//! Validation feed abstraction and its RTR implementation.
//!
//! A feed delivers [`ValidationEvent`]s to one registered [`EventSink`] from a
//! thread it owns. The bridge makes no assumption about which thread calls it.

mod rtr;
mod ssh;
mod table;

use std::io;
use std::sync::Arc;

use roa_bridge_config::FeedSettings;
use thiserror::Error;

use crate::event::ValidationEvent;

pub use rtr::{RtrFeed, RtrFeedFactory};
pub use table::PrefixTable;

const FEED_TARGET: &str = module_path!();

/// Receiver of validation events.
pub trait EventSink: Send + Sync {
    /// Handles one event. Called in feed order, never concurrently.
    fn on_event(&self, event: ValidationEvent);
}

impl<T> EventSink for Arc<T>
where
    T: EventSink + ?Sized,
{
    fn on_event(&self, event: ValidationEvent) {
        (**self).on_event(event);
    }
}

/// Handle to a running feed.
pub trait ValidationFeed: Send {
    /// Starts delivering events.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] when the feed's runtime cannot be started.
    fn start(&mut self) -> Result<(), FeedError>;

    /// Stops delivery and waits for the feed thread to finish.
    fn stop(&mut self);
}

/// Builds feeds bound to a sink.
pub trait FeedFactory: Send + Sync {
    /// Feed type produced.
    type Feed: ValidationFeed;

    /// Creates a feed for `settings` that reports to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] when the feed cannot be built for `settings`.
    fn create(
        &self,
        settings: &FeedSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self::Feed, FeedError>;
}

/// Errors raised while initialising a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The async runtime could not be built.
    #[error("failed to build feed runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The feed thread could not be spawned.
    #[error("failed to spawn feed thread: {source}")]
    Thread {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// `start` was called on a running feed.
    #[error("feed is already running")]
    AlreadyStarted,
}
