//! Background receive loop for advertisements.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lanlobby_protocol::{Advertisement, JsonCodec, ProtocolError, decode_datagram};
use lanlobby_transport::udp::MAX_DATAGRAM_LEN;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{DiscoveryError, DiscoveryEvent, LobbyAdvertisement, LobbyRegistry};

pub(crate) struct ListenerContext {
    pub registry: Arc<Mutex<LobbyRegistry>>,
    pub events: mpsc::Sender<DiscoveryEvent>,
    pub prune_interval: Duration,
    pub prune_after: Duration,
}

pub(crate) async fn run(
    socket: UdpSocket,
    ctx: ListenerContext,
    mut shutdown: watch::Receiver<bool>,
) {
    let codec = JsonCodec;
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    let mut prune_tick = tokio::time::interval(ctx.prune_interval);

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, source)) => {
                    if let Err(e) = handle_datagram(&codec, &buf[..len], source, &ctx) {
                        debug!(error = %e, %source, "discarding discovery datagram");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "discovery receive failed");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            },
            _ = prune_tick.tick() => prune_expired(&ctx),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("discovery listener stopped");
}

fn handle_datagram(
    codec: &JsonCodec,
    bytes: &[u8],
    source: SocketAddr,
    ctx: &ListenerContext,
) -> Result<(), DiscoveryError> {
    let packet = match decode_datagram::<Advertisement>(codec, bytes) {
        Ok(packet) => packet,
        // Other traffic sharing the port.
        Err(ProtocolError::InvalidMagic) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let entry = LobbyAdvertisement::from_packet(packet, source.ip(), Instant::now())?;

    let event = ctx
        .registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .upsert(entry);
    trace!(?event, "advertisement received");
    if let Some(event) = event {
        queue_event(ctx, event);
    }
    Ok(())
}

/// Queues `event` unless the queue is full. The registry stays current
/// either way, so a reader that never drains events loses nothing.
fn queue_event(ctx: &ListenerContext, event: DiscoveryEvent) {
    if let Err(mpsc::error::TrySendError::Full(event)) = ctx.events.try_send(event) {
        debug!(?event, "discovery event queue full, dropping event");
    }
}

fn prune_expired(ctx: &ListenerContext) {
    let expired = ctx
        .registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .prune(Instant::now(), ctx.prune_after);

    for key in expired {
        debug!(lobby = %key.name, address = %key.address, port = key.port, "lobby expired");
        queue_event(ctx, DiscoveryEvent::Expired(key));
    }
}
