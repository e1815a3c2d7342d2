//! RTR feed backed by the `rpki` crate's client.
//!
//! The client runs on a current-thread `tokio` runtime inside a dedicated
//! thread, over plain TCP or an SSH subsystem channel. Each cache session starts with a reset; the [`PrefixTable`] turns
//! that snapshot into only the changes the bridge has not yet seen, so a
//! reconnect does not replay the whole table to the routing daemon.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use roa_bridge_config::{FeedSettings, FeedTransport};
use rpki::rtr::client::{Client, PayloadError, PayloadTarget, PayloadUpdate};
use rpki::rtr::payload::{Action as RtrAction, Payload, Timing};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::ssh::{self, SshChannel};
use super::{EventSink, FEED_TARGET, FeedError, FeedFactory, PrefixTable, ValidationFeed};
use crate::event::{Action, RouteOrigin};

/// Builds [`RtrFeed`]s for TCP and SSH endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct RtrFeedFactory;

impl FeedFactory for RtrFeedFactory {
    type Feed = RtrFeed;

    fn create(
        &self,
        settings: &FeedSettings,
        sink: Arc<dyn EventSink>,
    ) -> Result<RtrFeed, FeedError> {
        Ok(RtrFeed::new(settings.clone(), sink))
    }
}

/// RTR cache session supervisor.
pub struct RtrFeed {
    settings: FeedSettings,
    sink: Arc<dyn EventSink>,
    stop: Option<watch::Sender<bool>>,
    worker: Option<JoinHandle<()>>,
}

impl RtrFeed {
    fn new(settings: FeedSettings, sink: Arc<dyn EventSink>) -> Self {
        Self {
            settings,
            sink,
            stop: None,
            worker: None,
        }
    }
}

impl ValidationFeed for RtrFeed {
    fn start(&mut self) -> Result<(), FeedError> {
        if self.worker.is_some() {
            return Err(FeedError::AlreadyStarted);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| FeedError::Runtime { source })?;
        let (stop_tx, stop_rx) = watch::channel(false);
        let settings = self.settings.clone();
        let target = SinkTarget::new(Arc::clone(&self.sink));
        let worker = thread::Builder::new()
            .name("rtr-feed".to_owned())
            .spawn(move || runtime.block_on(supervise(settings, target, stop_rx)))
            .map_err(|source| FeedError::Thread { source })?;
        info!(target: FEED_TARGET, cache = %self.settings, "validation feed started");
        self.stop = Some(stop_tx);
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The worker may already have exited, dropping the receiver.
            let _ = stop.send(true);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(target: FEED_TARGET, "validation feed thread panicked");
            } else {
                info!(target: FEED_TARGET, "validation feed stopped");
            }
        }
    }
}

impl Drop for RtrFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn supervise(settings: FeedSettings, target: SinkTarget, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            outcome = session(&settings, target.clone()) => match outcome {
                Ok(()) => info!(target: FEED_TARGET, cache = %settings, "cache closed the session"),
                Err(error) => warn!(
                    target: FEED_TARGET,
                    cache = %settings,
                    error = %error,
                    "cache session failed"
                ),
            },
            _ = stop.changed() => return,
        }
        debug!(
            target: FEED_TARGET,
            retry_secs = settings.retry_interval().as_secs(),
            "waiting before reconnecting to cache"
        );
        tokio::select! {
            () = tokio::time::sleep(settings.retry_interval()) => {}
            _ = stop.changed() => return,
        }
    }
}

async fn session(settings: &FeedSettings, target: SinkTarget) -> io::Result<()> {
    let stream = tokio::time::timeout(settings.connect_timeout(), connect(settings))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out connecting to cache"))??;
    info!(target: FEED_TARGET, cache = %settings, "connected to cache");
    match settings.transport() {
        FeedTransport::Tcp => {
            let mut client = Client::new(stream, target, None);
            client.run().await
        }
        FeedTransport::Ssh(credentials) => {
            let SshChannel { session, stream } = ssh::open_channel(stream, credentials).await?;
            let mut client = Client::new(stream, target, None);
            let outcome = client.run().await;
            drop(session);
            outcome
        }
    }
}

async fn connect(settings: &FeedSettings) -> io::Result<TcpStream> {
    let Some(local) = settings.bind_address() else {
        return TcpStream::connect((settings.host(), settings.port())).await;
    };
    let remote = lookup_host((settings.host(), settings.port()))
        .await?
        .find(|candidate| candidate.is_ipv4() == local.is_ipv4())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no cache address matches the bind address family",
            )
        })?;
    let socket = if remote.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.bind(SocketAddr::new(local, 0))?;
    socket.connect(remote).await
}

/// Receives payload sets from the client and forwards the net changes.
#[derive(Clone)]
struct SinkTarget {
    table: Arc<Mutex<PrefixTable>>,
    sink: Arc<dyn EventSink>,
}

impl SinkTarget {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            table: Arc::new(Mutex::new(PrefixTable::default())),
            sink,
        }
    }
}

/// Payload changes collected between the client's `start` and `apply`.
struct PendingUpdate {
    reset: bool,
    records: Vec<(Action, RouteOrigin)>,
}

impl PayloadUpdate for PendingUpdate {
    fn push_update(&mut self, action: RtrAction, payload: Payload) -> Result<(), PayloadError> {
        if let Payload::Origin(origin) = payload {
            let prefix = origin.prefix.prefix();
            let action = match action {
                RtrAction::Announce => Action::Announce,
                RtrAction::Withdraw => Action::Withdraw,
            };
            self.records.push((
                action,
                RouteOrigin {
                    address: prefix.addr(),
                    min_length: prefix.len(),
                    max_length: origin.prefix.resolved_max_len(),
                    origin_asn: origin.asn.into_u32(),
                },
            ));
        }
        Ok(())
    }
}

impl PayloadTarget for SinkTarget {
    type Update = PendingUpdate;

    fn start(&mut self, reset: bool) -> PendingUpdate {
        PendingUpdate {
            reset,
            records: Vec::new(),
        }
    }

    fn apply(&mut self, update: PendingUpdate, timing: Timing) -> Result<(), PayloadError> {
        let changes = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if update.reset {
                let snapshot: Vec<RouteOrigin> = update
                    .records
                    .iter()
                    .filter(|(action, _)| *action == Action::Announce)
                    .map(|(_, origin)| *origin)
                    .collect();
                table.replace(&snapshot)
            } else {
                update
                    .records
                    .into_iter()
                    .filter_map(|(action, origin)| table.apply(action, origin))
                    .collect()
            }
        };
        debug!(
            target: FEED_TARGET,
            reset = update.reset,
            changes = changes.len(),
            refresh_secs = timing.refresh,
            "applying cache update"
        );
        for change in changes {
            self.sink.on_event(change);
        }
        Ok(())
    }
}
