//! Owner of the advertiser and listener tasks.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lanlobby_transport::udp;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::info;

use crate::listener::{self, ListenerContext};
use crate::{
    AdvertisementSource, DiscoveryConfig, DiscoveryError, DiscoveryEvent, LobbyAdvertisement,
    LobbyRegistry, advertiser,
};

/// Events held for [`DiscoveryService::drain_events`]. Further events are
/// dropped until the queue is drained.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// A spawned loop that stops when told to or when dropped.
#[derive(Debug)]
struct BackgroundTask {
    shutdown: watch::Sender<bool>,
}

impl BackgroundTask {
    fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        tokio::spawn(run(rx));
        Self { shutdown }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// LAN discovery for one process: advertise a hosted lobby, browse
/// other hosts' lobbies, or both.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct DiscoveryService {
    config: DiscoveryConfig,
    registry: Arc<Mutex<LobbyRegistry>>,
    events_tx: mpsc::Sender<DiscoveryEvent>,
    events_rx: mpsc::Receiver<DiscoveryEvent>,
    sender: Option<Arc<UdpSocket>>,
    advertiser: Option<BackgroundTask>,
    listener: Option<(BackgroundTask, SocketAddr)>,
}

impl DiscoveryService {
    /// Creates an idle service.
    ///
    /// # Errors
    /// `DiscoveryError::InvalidConfig` if `config` fails validation.
    pub fn new(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Ok(Self {
            registry: Arc::new(Mutex::new(LobbyRegistry::new(config.staleness_window))),
            config,
            events_tx,
            events_rx,
            sender: None,
            advertiser: None,
            listener: None,
        })
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Starts broadcasting `source` every `interval`, replacing any running
    /// advertiser. The broadcast socket is opened on first use and reused.
    ///
    /// # Errors
    /// Socket setup failures; advertising stays off.
    pub fn start_advertising(
        &mut self,
        source: impl AdvertisementSource,
        interval: Duration,
    ) -> Result<(), DiscoveryError> {
        if interval.is_zero() {
            return Err(DiscoveryError::InvalidConfig(
                "advertising interval must be greater than zero".into(),
            ));
        }
        self.stop_advertising();

        let socket = match &self.sender {
            Some(socket) => Arc::clone(socket),
            None => {
                let socket = Arc::new(udp::bind_broadcast_sender()?);
                self.sender = Some(Arc::clone(&socket));
                socket
            }
        };
        let target = self.config.broadcast_target();
        self.advertiser = Some(BackgroundTask::spawn(move |shutdown| {
            advertiser::run(socket, target, interval, source, shutdown)
        }));
        info!(%target, ?interval, "advertising started");
        Ok(())
    }

    /// Stops advertising. No-op if not advertising.
    pub fn stop_advertising(&mut self) {
        if self.advertiser.take().is_some() {
            info!("advertising stopped");
        }
    }

    pub fn is_advertising(&self) -> bool {
        self.advertiser.is_some()
    }

    /// Starts the receive loop on the configured port and returns the bound
    /// address. Returns the existing address if already listening.
    ///
    /// # Errors
    /// `DiscoveryError::Socket` if the port cannot be bound (commonly:
    /// another process already listens on it). Not retried.
    pub fn start_listening(&mut self) -> Result<SocketAddr, DiscoveryError> {
        if let Some((_, addr)) = &self.listener {
            return Ok(*addr);
        }

        let socket = udp::bind_listener(self.config.port)?;
        let addr = socket
            .local_addr()
            .map_err(lanlobby_transport::TransportError::ReceiveFailed)?;
        let ctx = ListenerContext {
            registry: Arc::clone(&self.registry),
            events: self.events_tx.clone(),
            prune_interval: self.config.staleness_window,
            prune_after: self.config.prune_after(),
        };
        let task = BackgroundTask::spawn(move |shutdown| listener::run(socket, ctx, shutdown));
        self.listener = Some((task, addr));
        info!(%addr, "discovery listening");
        Ok(addr)
    }

    /// Stops the receive loop. Known lobbies are kept.
    pub fn stop_listening(&mut self) {
        if self.listener.take().is_some() {
            info!("discovery listener stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Address the listener is bound to, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|(_, addr)| *addr)
    }

    /// Lobbies heard from within the staleness window.
    pub fn discovered_lobbies(&self) -> Vec<LobbyAdvertisement> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible(Instant::now())
    }

    /// Takes every event queued since the last call. At most
    /// [`EVENT_QUEUE_CAPACITY`] are kept between calls.
    pub fn drain_events(&mut self) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Stops both halves and forgets known lobbies. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop_advertising();
        self.stop_listening();
        self.sender = None;
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
