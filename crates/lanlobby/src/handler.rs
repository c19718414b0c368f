//! Per-connection handler: `Join` handshake, then roster mirroring.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection so the lobby can close it
//!   2. Receive `Join` → submit it to the lobby actor → reply with the verdict
//!   3. Loop: forward roster snapshots, answer client messages, ping,
//!      and hang up when kicked or when the lobby closes

use std::sync::Arc;
use std::time::Duration;

use lanlobby_lobby::{JoinOutcome, JoinRequest, LobbyHandle};
use lanlobby_protocol::{
    ClientMessage, Codec, ConnectionId, JsonCodec, ProtocolError, ServerMessage,
};
use lanlobby_transport::{Connection, ConnectionRegistry, WebSocketConnection};
use tokio::time::{Instant, MissedTickBehavior};

use crate::LanLobbyError;
use crate::server::ServerState;

/// Removes the connection from the registry and the roster when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the kick is a fire-and-forget task.
struct ConnectionGuard {
    connection_id: ConnectionId,
    registry: ConnectionRegistry,
    lobby: LobbyHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let connection_id = self.connection_id;
        self.registry.unregister(connection_id);
        let lobby = self.lobby.clone();
        tokio::spawn(async move {
            let _ = lobby.kick(connection_id).await;
        });
    }
}

/// What the message loop does after handling a client message.
enum Flow {
    Continue,
    Close,
}

/// Outstanding ping awaiting its pong.
struct PendingPing {
    nonce: u64,
    sent_at: Instant,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), LanLobbyError> {
    let connection_id = conn.id();
    tracing::debug!(%connection_id, peer = %conn.peer_addr(), "handling new connection");

    let mut close_signal = state.registry.register(connection_id);
    let _guard = ConnectionGuard {
        connection_id,
        registry: state.registry.clone(),
        lobby: state.lobby.clone(),
    };

    // --- Step 1: Join handshake ---
    if !perform_join(&conn, &state).await? {
        let _ = conn.close().await;
        return Ok(());
    }

    // --- Step 2: Message loop ---
    // The mirror starts after the join, so its current snapshot already
    // contains this member and was sent in the reply.
    let mut mirror = state.lobby.mirror();
    mirror.latest();

    let mut ping = tokio::time::interval(state.session.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;

    let mut nonce: u64 = 0;
    let mut pending: Option<PendingPing> = None;
    let mut last_heard = Instant::now();
    let mut start_announced = false;

    loop {
        tokio::select! {
            snapshot = mirror.changed() => {
                let Some(roster) = snapshot else {
                    tracing::info!(%connection_id, "lobby closed, disconnecting");
                    let _ = send(&conn, &state.codec, &ServerMessage::LobbyClosed).await;
                    break;
                };
                if !roster.contains(connection_id) {
                    tracing::info!(%connection_id, "no longer in roster, disconnecting");
                    let kicked = ServerMessage::Kicked {
                        reason: "removed from lobby".into(),
                    };
                    let _ = send(&conn, &state.codec, &kicked).await;
                    break;
                }
                let starting = roster.state.is_started() && !start_announced;
                send(&conn, &state.codec, &ServerMessage::Roster { roster }).await?;
                if starting {
                    start_announced = true;
                    send(&conn, &state.codec, &ServerMessage::GameStarting).await?;
                }
            }

            received = conn.recv() => {
                let data = match received {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%connection_id, "connection closed cleanly");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%connection_id, error = %e, "recv error");
                        break;
                    }
                };
                last_heard = Instant::now();

                let msg: ClientMessage = match state.codec.decode(&data) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::debug!(
                            %connection_id,
                            error = %e,
                            "failed to decode client message"
                        );
                        continue;
                    }
                };
                let flow =
                    handle_client_message(&conn, &state, &mut mirror, &mut pending, msg).await?;
                if let Flow::Close = flow {
                    break;
                }
            }

            _ = close_signal.closed() => {
                tracing::info!(%connection_id, "connection closed by lobby");
                let kicked = ServerMessage::Kicked {
                    reason: "removed from lobby".into(),
                };
                let _ = send(&conn, &state.codec, &kicked).await;
                break;
            }

            _ = ping.tick() => {
                if last_heard.elapsed() > state.session.idle_timeout {
                    tracing::info!(%connection_id, "connection timed out");
                    break;
                }
                nonce += 1;
                pending = Some(PendingPing { nonce, sent_at: Instant::now() });
                send(&conn, &state.codec, &ServerMessage::Ping { nonce }).await?;
            }
        }
    }

    let _ = conn.close().await;
    // _guard drops here → unregister + kick.
    Ok(())
}

/// Receives the `Join`, submits it, and sends the verdict. Returns `true`
/// if the connection is now a member.
async fn perform_join(
    conn: &WebSocketConnection,
    state: &ServerState,
) -> Result<bool, LanLobbyError> {
    let connection_id = conn.id();
    let data = match tokio::time::timeout(state.session.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            let reason = "connection closed before join".to_string();
            return Err(ProtocolError::InvalidMessage(reason).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err(LanLobbyError::Timeout("join")),
    };

    let Ok(ClientMessage::Join {
        display_name,
        loadout_tag,
        password,
        version,
    }) = state.codec.decode::<ClientMessage>(&data)
    else {
        return Err(ProtocolError::InvalidMessage("first message must be Join".into()).into());
    };

    let request = JoinRequest {
        connection_id,
        display_name,
        loadout_tag,
        password,
        version,
    };

    match state.lobby.join(request).await? {
        JoinOutcome::Accepted => {
            let roster = state.lobby.mirror().latest();
            send(conn, &state.codec, &ServerMessage::JoinAccepted { connection_id, roster }).await?;
            Ok(true)
        }
        JoinOutcome::Rejected(reason) => {
            let rejected = ServerMessage::JoinRejected {
                reason,
                message: reason.to_string(),
            };
            send(conn, &state.codec, &rejected).await?;
            Ok(false)
        }
    }
}

async fn handle_client_message(
    conn: &WebSocketConnection,
    state: &ServerState,
    mirror: &mut lanlobby_replication::RosterMirror,
    pending: &mut Option<PendingPing>,
    msg: ClientMessage,
) -> Result<Flow, LanLobbyError> {
    let connection_id = conn.id();
    match msg {
        ClientMessage::RequestRoster => {
            let roster = mirror.latest();
            send(conn, &state.codec, &ServerMessage::Roster { roster }).await?;
        }
        ClientMessage::SetLoadout { loadout_tag } => {
            state.lobby.update_loadout(connection_id, loadout_tag).await?;
        }
        ClientMessage::Pong { nonce } => match pending.take() {
            Some(ping) if ping.nonce == nonce => {
                let rtt = ping.sent_at.elapsed();
                state.lobby.update_ping(connection_id, millis(rtt)).await?;
            }
            other => {
                tracing::debug!(%connection_id, nonce, "unexpected pong");
                *pending = other;
            }
        },
        ClientMessage::Leave => {
            tracing::info!(%connection_id, "client left");
            state.lobby.kick(connection_id).await?;
            return Ok(Flow::Close);
        }
        ClientMessage::Join { .. } => {
            tracing::debug!(%connection_id, "ignoring repeated join");
        }
    }
    Ok(Flow::Continue)
}

async fn send(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    msg: &ServerMessage,
) -> Result<(), LanLobbyError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
