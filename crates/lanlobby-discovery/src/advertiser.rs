//! Periodic advertisement broadcast.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lanlobby_protocol::{Advertisement, JsonCodec, LobbySummary, encode_datagram};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Produces the advertisement for the next broadcast tick.
pub trait AdvertisementSource: Send + 'static {
    fn advertisement(&mut self) -> Advertisement;
}

/// A fixed advertisement, sent unchanged on every tick.
impl AdvertisementSource for Advertisement {
    fn advertisement(&mut self) -> Advertisement {
        self.clone()
    }
}

/// Advertisement rebuilt on every tick from the lobby's published summary,
/// so player counts are always current.
#[derive(Debug, Clone)]
pub struct LiveAdvertisement {
    summary: watch::Receiver<LobbySummary>,
    session_port: u16,
}

impl LiveAdvertisement {
    pub fn new(summary: watch::Receiver<LobbySummary>, session_port: u16) -> Self {
        Self {
            summary,
            session_port,
        }
    }
}

impl AdvertisementSource for LiveAdvertisement {
    fn advertisement(&mut self) -> Advertisement {
        self.summary.borrow().advertisement(self.session_port)
    }
}

/// Runs until `shutdown` flips to `true` or its sender is dropped.
pub(crate) async fn run(
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    period: Duration,
    mut source: impl AdvertisementSource,
    mut shutdown: watch::Receiver<bool>,
) {
    let codec = JsonCodec;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let advertisement = source.advertisement();
                let bytes = match encode_datagram(&codec, &advertisement) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(
                            error = %e,
                            lobby = %advertisement.lobby_name,
                            "cannot encode advertisement"
                        );
                        continue;
                    }
                };
                if let Err(e) = socket.send_to(&bytes, target).await {
                    warn!(error = %e, %target, "advertisement send failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!(%target, "advertiser stopped");
}
