//! Lobby actor: an isolated Tokio task that owns the roster.
//!
//! The outside world talks to it only through [`LobbyHandle`]. Replies
//! come back on oneshot channels; fire-and-forget commands have none.

use std::sync::Arc;

use lanlobby_protocol::{ConnectionId, JoinRejection, LobbySummary, RosterSnapshot};
use lanlobby_replication::{RosterMirror, RosterPublisher};
use lanlobby_transport::ConnectionControl;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::{JoinOutcome, JoinRequest, LobbyConfig, LobbyError, LobbyRoster};

pub(crate) enum LobbyCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<JoinOutcome>,
    },
    Kick {
        connection_id: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Start {
        reply: oneshot::Sender<bool>,
    },
    UpdatePing {
        connection_id: ConnectionId,
        ping_millis: u32,
    },
    UpdateLoadout {
        connection_id: ConnectionId,
        loadout_tag: String,
    },
    Snapshot {
        reply: oneshot::Sender<RosterSnapshot>,
    },
    Shutdown,
}

/// Handle to a running lobby actor. Cheap to clone.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
    mirror: RosterMirror,
    summary: watch::Receiver<LobbySummary>,
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl LobbyHandle {
    /// Submits a join and waits for the verdict. A rejected connection has
    /// already been told to close when this returns.
    pub async fn join(&self, request: JoinRequest) -> Result<JoinOutcome, LobbyError> {
        self.request(|reply| LobbyCommand::Join { request, reply }).await
    }

    /// Removes a member and closes its connection. Returns `false` if the
    /// id was not in the roster.
    pub async fn kick(&self, connection_id: ConnectionId) -> Result<bool, LobbyError> {
        self.request(|reply| LobbyCommand::Kick {
            connection_id,
            reply,
        })
        .await
    }

    /// Starts the game. Returns `true` only for the call that started it.
    pub async fn start(&self) -> Result<bool, LobbyError> {
        self.request(|reply| LobbyCommand::Start { reply }).await
    }

    pub async fn update_ping(
        &self,
        connection_id: ConnectionId,
        ping_millis: u32,
    ) -> Result<(), LobbyError> {
        self.send(LobbyCommand::UpdatePing {
            connection_id,
            ping_millis,
        })
        .await
    }

    pub async fn update_loadout(
        &self,
        connection_id: ConnectionId,
        loadout_tag: String,
    ) -> Result<(), LobbyError> {
        self.send(LobbyCommand::UpdateLoadout {
            connection_id,
            loadout_tag,
        })
        .await
    }

    /// The roster as of the moment the actor reads this command.
    pub async fn snapshot(&self) -> Result<RosterSnapshot, LobbyError> {
        self.request(|reply| LobbyCommand::Snapshot { reply }).await
    }

    /// A new per-connection mirror, starting with the current roster.
    pub fn mirror(&self) -> RosterMirror {
        self.mirror.fork()
    }

    /// Latest published summary.
    pub fn summary(&self) -> LobbySummary {
        self.summary.borrow().clone()
    }

    /// Receiver for the summary channel, for advertisers and responders.
    pub fn summary_receiver(&self) -> watch::Receiver<LobbySummary> {
        self.summary.clone()
    }

    /// Resolves once the game has started.
    ///
    /// # Errors
    /// `LobbyError::Unavailable` if the lobby stops without starting.
    pub async fn started(&self) -> Result<(), LobbyError> {
        let mut summary = self.summary.clone();
        summary
            .wait_for(|s| s.state.is_started())
            .await
            .map(|_| ())
            .map_err(|_| LobbyError::Unavailable)
    }

    /// Tells the actor to stop. Mirrors end once it has.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Shutdown).await
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LobbyCommand,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }
}

struct LobbyActor {
    roster: LobbyRoster,
    config: LobbyConfig,
    publisher: RosterPublisher,
    summary: watch::Sender<LobbySummary>,
    connections: Arc<dyn ConnectionControl>,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    async fn run(mut self) {
        tracing::info!(
            lobby = %self.roster.name(),
            max_players = self.roster.max_players(),
            password_protected = self.roster.password_protected(),
            "lobby actor started"
        );

        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(LobbyCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                _ = sweep.tick() => self.handle_sweep(),
            }
        }

        tracing::info!(lobby = %self.roster.name(), "lobby actor stopped");
    }

    fn handle(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::Join { request, reply } => {
                let outcome = self.handle_join(request);
                let _ = reply.send(outcome);
            }
            LobbyCommand::Kick {
                connection_id,
                reply,
            } => {
                let removed = self.handle_kick(connection_id);
                let _ = reply.send(removed);
            }
            LobbyCommand::Start { reply } => {
                let started = self.roster.start();
                if started {
                    tracing::info!(
                        lobby = %self.roster.name(),
                        players = self.roster.len(),
                        "game started"
                    );
                    self.publish();
                }
                let _ = reply.send(started);
            }
            LobbyCommand::UpdatePing {
                connection_id,
                ping_millis,
            } => {
                if self.roster.update_ping(connection_id, ping_millis) {
                    self.publish();
                }
            }
            LobbyCommand::UpdateLoadout {
                connection_id,
                loadout_tag,
            } => {
                if self.roster.update_loadout(connection_id, loadout_tag) {
                    tracing::debug!(%connection_id, "loadout changed");
                    self.publish();
                } else {
                    tracing::debug!(%connection_id, "loadout change ignored");
                }
            }
            LobbyCommand::Snapshot { reply } => {
                let _ = reply.send(self.roster.snapshot());
            }
            LobbyCommand::Shutdown => {}
        }
    }

    fn handle_join(&mut self, request: JoinRequest) -> JoinOutcome {
        let connection_id = request.connection_id;
        let display_name = request.display_name.clone();
        let outcome = self.roster.join(request);

        match outcome {
            JoinOutcome::Accepted => {
                tracing::info!(
                    %connection_id,
                    %display_name,
                    players = self.roster.len(),
                    "member joined"
                );
                self.publish();
            }
            JoinOutcome::Rejected(reason) => {
                tracing::info!(%connection_id, %display_name, %reason, "join rejected");
                // A duplicate join comes from a connection that is already a
                // member; closing it would evict the member.
                if reason != JoinRejection::DuplicateConnection {
                    self.connections.close(connection_id);
                }
            }
        }
        outcome
    }

    fn handle_kick(&mut self, connection_id: ConnectionId) -> bool {
        if connection_id.is_host() {
            tracing::warn!("ignoring kick of the host");
            return false;
        }
        let removed = self.roster.kick(connection_id);
        self.connections.close(connection_id);
        match removed {
            Some(member) => {
                tracing::info!(
                    %connection_id,
                    display_name = %member.display_name,
                    players = self.roster.len(),
                    "member removed"
                );
                self.publish();
                true
            }
            None => false,
        }
    }

    fn handle_sweep(&mut self) {
        let connections = Arc::clone(&self.connections);
        let dropped = self.roster.sweep(|id| connections.is_alive(id));
        if dropped.is_empty() {
            return;
        }
        for member in &dropped {
            tracing::info!(
                connection_id = %member.connection_id,
                display_name = %member.display_name,
                "dropped member with dead connection"
            );
        }
        self.publish();
    }

    fn publish(&self) {
        self.publisher.publish(self.roster.snapshot());
        let summary = self.roster.summary();
        self.summary.send_if_modified(|current| {
            if *current == summary {
                return false;
            }
            *current = summary;
            true
        });
    }
}

/// Spawns a lobby actor and returns a handle to it.
///
/// # Errors
/// `LobbyError::InvalidConfig` if `config` fails validation.
pub(crate) fn spawn_lobby(
    config: LobbyConfig,
    connections: Arc<dyn ConnectionControl>,
) -> Result<LobbyHandle, LobbyError> {
    config.validate()?;
    let (tx, rx) = mpsc::channel(config.command_channel_size);

    let roster = LobbyRoster::new(&config);
    let publisher = RosterPublisher::new(roster.snapshot());
    let mirror = publisher.mirror();
    let (summary_tx, summary_rx) = watch::channel(roster.summary());

    let actor = LobbyActor {
        roster,
        config,
        publisher,
        summary: summary_tx,
        connections,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    Ok(LobbyHandle {
        sender: tx,
        mirror,
        summary: summary_rx,
    })
}
