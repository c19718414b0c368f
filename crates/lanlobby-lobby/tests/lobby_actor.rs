//! Lobby actor driven through its handle, with a real connection registry.

use std::sync::Arc;
use std::time::Duration;

use lanlobby_lobby::{JoinOutcome, JoinRequest, LobbyConfig, LobbyError, LobbyHost};
use lanlobby_protocol::{ConnectionId, JoinRejection, LobbyState, PROTOCOL_VERSION};
use lanlobby_transport::ConnectionRegistry;

fn config(password: &str, max_players: usize) -> LobbyConfig {
    LobbyConfig {
        name: "Alpha".into(),
        password: password.into(),
        max_players,
        host_name: "host".into(),
        sweep_interval: Duration::from_secs(60),
        ..Default::default()
    }
}

fn request(id: u64, password: &str) -> JoinRequest {
    JoinRequest {
        connection_id: ConnectionId::new(id),
        display_name: format!("player-{id}"),
        loadout_tag: String::new(),
        password: password.into(),
        version: PROTOCOL_VERSION,
    }
}

fn host() -> (LobbyHost, ConnectionRegistry) {
    let registry = ConnectionRegistry::new();
    (LobbyHost::new(Arc::new(registry.clone())), registry)
}

#[tokio::test]
async fn test_capacity_limit_closes_rejected_connection() {
    let (mut host, registry) = host();
    let lobby = host.create_lobby(config("", 3)).await.unwrap();

    let _a = registry.register(ConnectionId::new(5));
    let _b = registry.register(ConnectionId::new(6));
    let c = registry.register(ConnectionId::new(7));

    assert!(lobby.join(request(5, "")).await.unwrap().is_accepted());
    assert!(lobby.join(request(6, "")).await.unwrap().is_accepted());
    assert_eq!(lobby.summary().state, LobbyState::Full);

    let third = lobby.join(request(7, "")).await.unwrap();
    assert_eq!(third, JoinOutcome::Rejected(JoinRejection::LobbyFull));
    assert!(c.is_closed());

    let roster = lobby.snapshot().await.unwrap();
    assert_eq!(roster.members.len(), 3);
    assert_eq!(roster.state, LobbyState::Full);
}

#[tokio::test]
async fn test_join_after_start_rejected() {
    let (mut host, _registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();
    assert!(lobby.join(request(5, "")).await.unwrap().is_accepted());

    assert!(host.start().await.unwrap());
    assert!(!host.start().await.unwrap());

    let late = lobby.join(request(9, "")).await.unwrap();
    assert_eq!(late, JoinOutcome::Rejected(JoinRejection::AlreadyStarted));
    let roster = lobby.snapshot().await.unwrap();
    assert_eq!(roster.state, LobbyState::Started);
    assert!(!roster.contains(ConnectionId::new(9)));
}

#[tokio::test]
async fn test_started_resolves_after_start() {
    let (mut host, _registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();

    let waiter = {
        let lobby = lobby.clone();
        tokio::spawn(async move { lobby.started().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    lobby.start().await.unwrap();
    assert!(waiter.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_kick_updates_mirrors_and_closes_connection() {
    let (mut host, registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();
    let signal = registry.register(ConnectionId::new(5));
    lobby.join(request(5, "")).await.unwrap();

    let mut mirror = lobby.mirror();
    assert!(mirror.changed().await.unwrap().contains(ConnectionId::new(5)));

    assert!(host.kick(ConnectionId::new(5)).await.unwrap());
    assert!(signal.is_closed());
    let after = mirror.changed().await.unwrap();
    assert!(!after.contains(ConnectionId::new(5)));

    // Absent id: no-op, no new snapshot.
    assert!(!host.kick(ConnectionId::new(5)).await.unwrap());
    assert!(!host.kick(ConnectionId::HOST).await.unwrap());
    assert!(!mirror.has_pending());
}

#[tokio::test]
async fn test_concurrent_joins_never_exceed_capacity() {
    let (mut host, _registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();

    let mut tasks = Vec::new();
    for id in 1..=20 {
        let lobby = lobby.clone();
        tasks.push(tokio::spawn(async move { lobby.join(request(id, "")).await }));
    }
    let mut accepted = 0;
    for task in tasks {
        if task.await.unwrap().unwrap().is_accepted() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 3);
    assert_eq!(lobby.snapshot().await.unwrap().members.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_drops_dead_connections() {
    let (mut host, registry) = host();
    let lobby = host
        .create_lobby(LobbyConfig {
            sweep_interval: Duration::from_millis(100),
            ..config("", 4)
        })
        .await
        .unwrap();
    let _alive = registry.register(ConnectionId::new(5));
    let _dead = registry.register(ConnectionId::new(6));
    lobby.join(request(5, "")).await.unwrap();
    lobby.join(request(6, "")).await.unwrap();

    registry.unregister(ConnectionId::new(6));
    tokio::time::sleep(Duration::from_millis(250)).await;

    let roster = lobby.snapshot().await.unwrap();
    assert!(roster.contains(ConnectionId::new(5)));
    assert!(!roster.contains(ConnectionId::new(6)));
    assert!(roster.contains(ConnectionId::HOST));
}

#[tokio::test]
async fn test_ping_and_loadout_updates_are_published() {
    let (mut host, registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();
    let _signal = registry.register(ConnectionId::new(5));
    lobby.join(request(5, "")).await.unwrap();

    lobby.update_ping(ConnectionId::new(5), 42).await.unwrap();
    lobby
        .update_loadout(ConnectionId::new(5), "shotgun".into())
        .await
        .unwrap();

    let roster = lobby.snapshot().await.unwrap();
    let member = roster
        .members
        .iter()
        .find(|m| m.connection_id == ConnectionId::new(5))
        .unwrap();
    assert_eq!(member.ping_millis, 42);
    assert_eq!(member.loadout_tag, "shotgun");
}

#[tokio::test]
async fn test_create_lobby_replaces_previous() {
    let (mut host, _registry) = host();
    let first = host.create_lobby(config("", 4)).await.unwrap();
    let mut old_mirror = first.mirror();
    old_mirror.latest();

    let second = host
        .create_lobby(LobbyConfig {
            name: "Beta".into(),
            ..config("", 2)
        })
        .await
        .unwrap();

    assert!(old_mirror.changed().await.is_none());
    assert!(matches!(
        first.join(request(5, "")).await,
        Err(LobbyError::Unavailable)
    ));
    assert_eq!(second.summary().lobby_name, "Beta");
    assert_eq!(host.handle().unwrap().summary().max_players, 2);
}

#[tokio::test]
async fn test_disband_is_idempotent() {
    let (mut host, _registry) = host();
    let lobby = host.create_lobby(config("", 4)).await.unwrap();
    let mut mirror = lobby.mirror();
    mirror.latest();

    assert!(host.disband().await);
    assert!(!host.disband().await);
    assert!(mirror.changed().await.is_none());
    assert!(matches!(host.start().await, Err(LobbyError::NoActiveLobby)));
    assert!(lobby.started().await.is_err());
}

#[tokio::test]
async fn test_invalid_config_keeps_previous_lobby() {
    let (mut host, _registry) = host();
    host.create_lobby(config("", 4)).await.unwrap();

    let err = host.create_lobby(config("", 0)).await.unwrap_err();
    assert!(matches!(err, LobbyError::InvalidConfig(_)));
    assert!(host.handle().is_ok());
}
