//! Feed double that replays a fixed list of events from its own thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use roa_bridge_config::FeedSettings;

use crate::event::ValidationEvent;
use crate::feed::{EventSink, FeedError, FeedFactory, ValidationFeed};

/// Factory for [`ScriptedFeed`]s sharing one script.
#[derive(Clone, Default)]
pub struct ScriptedFeedFactory {
    events: Arc<Mutex<Vec<ValidationEvent>>>,
    stopped: Arc<AtomicUsize>,
}

impl ScriptedFeedFactory {
    /// Appends events replayed by the next feed started.
    pub fn script(&self, events: impl IntoIterator<Item = ValidationEvent>) {
        self.events
            .lock()
            .expect("feed script mutex poisoned")
            .extend(events);
    }

    /// Number of feeds stopped so far.
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl FeedFactory for ScriptedFeedFactory {
    type Feed = ScriptedFeed;

    fn create(
        &self,
        _settings: &FeedSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<ScriptedFeed, FeedError> {
        Ok(ScriptedFeed {
            events: self
                .events
                .lock()
                .expect("feed script mutex poisoned")
                .clone(),
            sink,
            stopped: Arc::clone(&self.stopped),
            worker: None,
        })
    }
}

/// Feed that delivers its script once, in order.
pub struct ScriptedFeed {
    events: Vec<ValidationEvent>,
    sink: Arc<dyn EventSink>,
    stopped: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl ValidationFeed for ScriptedFeed {
    fn start(&mut self) -> Result<(), FeedError> {
        if self.worker.is_some() {
            return Err(FeedError::AlreadyStarted);
        }
        let events = std::mem::take(&mut self.events);
        let sink = Arc::clone(&self.sink);
        self.worker = Some(thread::spawn(move || {
            for event in events {
                sink.on_event(event);
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.join().expect("scripted feed thread panicked");
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}
