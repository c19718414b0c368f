//! Host-side responder task.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use lanlobby_protocol::{
    JsonCodec, LobbySummary, PreconnectQuery, decode_datagram, encode_datagram,
};
use lanlobby_transport::TransportError;
use lanlobby_transport::udp::{self, MAX_DATAGRAM_LEN};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{JoinPolicy, PreconnectError};

/// Answers preconnect queries for one hosted lobby until stopped or
/// dropped.
#[derive(Debug)]
pub struct PreconnectResponder {
    shutdown: watch::Sender<bool>,
    local_addr: SocketAddr,
}

impl PreconnectResponder {
    /// Binds `port` on all interfaces and starts answering. Verdicts are
    /// computed from the latest value in `summary`.
    ///
    /// # Errors
    /// `PreconnectError::Socket` if the port cannot be bound.
    pub fn spawn(
        port: u16,
        policy: JoinPolicy,
        summary: watch::Receiver<LobbySummary>,
    ) -> Result<Self, PreconnectError> {
        let socket = udp::bind_datagram(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))?;
        let local_addr = socket.local_addr().map_err(TransportError::ReceiveFailed)?;
        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(run(socket, policy, summary, shutdown_rx));
        info!(%local_addr, "preconnect responder started");
        Ok(Self {
            shutdown,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops answering. Idempotent.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for PreconnectResponder {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    socket: UdpSocket,
    policy: JoinPolicy,
    summary: watch::Receiver<LobbySummary>,
    mut shutdown: watch::Receiver<bool>,
) {
    let codec = JsonCodec;
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    loop {
        tokio::select! {
            result = socket.recv_from(&mut buf) => match result {
                Ok((len, from)) => {
                    answer(&socket, &codec, &policy, &summary, &buf[..len], from).await;
                }
                Err(e) => {
                    warn!(error = %e, "preconnect receive failed");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    debug!("preconnect responder stopped");
}

async fn answer(
    socket: &UdpSocket,
    codec: &JsonCodec,
    policy: &JoinPolicy,
    summary: &watch::Receiver<LobbySummary>,
    bytes: &[u8],
    from: SocketAddr,
) {
    let query = match decode_datagram::<PreconnectQuery>(codec, bytes) {
        Ok(query) => query,
        Err(e) => {
            debug!(error = %e, %from, "dropping preconnect datagram");
            return;
        }
    };

    let response = {
        let current = summary.borrow();
        policy.evaluate(&query, &current)
    };
    let PreconnectQuery::QueryJoin { player_name, .. } = &query;
    debug!(
        %from,
        player = %player_name,
        verdict = %response.result,
        "preconnect query answered"
    );

    match encode_datagram(codec, &response) {
        Ok(out) => {
            if let Err(e) = socket.send_to(&out, from).await {
                warn!(error = %e, %from, "preconnect reply failed");
            }
        }
        Err(e) => warn!(error = %e, "cannot encode preconnect reply"),
    }
}
