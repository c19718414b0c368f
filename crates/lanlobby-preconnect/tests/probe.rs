//! Probe against a live responder over loopback.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use lanlobby_preconnect::{
    JoinPolicy, PreconnectConfig, PreconnectResponder, PreconnectResult, probe,
};
use lanlobby_protocol::{LobbyState, LobbySummary, PROTOCOL_VERSION};
use lanlobby_transport::udp;
use tokio::sync::watch;

fn summary(current: usize, max: usize) -> LobbySummary {
    LobbySummary {
        lobby_name: "Alpha".into(),
        max_players: max,
        current_players: current,
        state: LobbyState::from_occupancy(current, max, false),
        password_protected: true,
    }
}

fn loopback(addr: SocketAddr) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, addr.port()))
}

fn config() -> PreconnectConfig {
    PreconnectConfig {
        timeout: Duration::from_secs(1),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_password_probe_outcomes() {
    let (_tx, rx) = watch::channel(summary(1, 4));
    let policy = JoinPolicy::new("x", PROTOCOL_VERSION);
    let responder = PreconnectResponder::spawn(0, policy, rx).unwrap();
    let target = loopback(responder.local_addr());

    let wrong = probe(target, "y", PROTOCOL_VERSION, "bob", &config()).await;
    assert_eq!(wrong, PreconnectResult::BadPassword);

    let right = probe(target, "x", PROTOCOL_VERSION, "bob", &config()).await;
    assert_eq!(right, PreconnectResult::Ok);

    let old_client = probe(target, "y", PROTOCOL_VERSION + 1, "bob", &config()).await;
    assert_eq!(old_client, PreconnectResult::VersionMismatch);
}

#[tokio::test]
async fn test_verdict_follows_published_summary() {
    let (tx, rx) = watch::channel(summary(1, 2));
    let policy = JoinPolicy::new("", PROTOCOL_VERSION);
    let responder = PreconnectResponder::spawn(0, policy, rx).unwrap();
    let target = loopback(responder.local_addr());

    assert_eq!(
        probe(target, "", PROTOCOL_VERSION, "a", &config()).await,
        PreconnectResult::Ok
    );

    tx.send_replace(summary(2, 2));
    assert_eq!(
        probe(target, "", PROTOCOL_VERSION, "b", &config()).await,
        PreconnectResult::LobbyFull
    );

    tx.send_modify(|s| s.state = LobbyState::Started);
    assert_eq!(
        probe(target, "", PROTOCOL_VERSION, "c", &config()).await,
        PreconnectResult::LobbyFull
    );
}

#[tokio::test]
async fn test_silent_host_times_out_within_grace() {
    // Bound but never answers.
    let silent = udp::bind_datagram("127.0.0.1:0".parse().unwrap()).unwrap();
    let target = silent.local_addr().unwrap();
    let config = PreconnectConfig {
        timeout: Duration::from_millis(600),
        ..Default::default()
    };

    let started = Instant::now();
    let result = probe(target, "", PROTOCOL_VERSION, "bob", &config).await;
    let elapsed = started.elapsed();

    assert_eq!(result, PreconnectResult::Timeout);
    assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1000), "{elapsed:?}");
}

#[tokio::test]
async fn test_garbage_reply_is_unknown() {
    let fake = udp::bind_datagram("127.0.0.1:0".parse().unwrap()).unwrap();
    let target = fake.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 1024];
        if let Ok((_, from)) = fake.recv_from(&mut buf).await {
            let _ = fake.send_to(b"LLPCR1{\"result\":\"Maybe\"}", from).await;
        }
    });

    let result = probe(target, "", PROTOCOL_VERSION, "bob", &config()).await;
    assert_eq!(result, PreconnectResult::Unknown);
}

#[tokio::test]
async fn test_stopped_responder_stays_silent() {
    let (_tx, rx) = watch::channel(summary(0, 4));
    let policy = JoinPolicy::new("", PROTOCOL_VERSION);
    let responder = PreconnectResponder::spawn(0, policy, rx).unwrap();
    let target = loopback(responder.local_addr());
    responder.stop();
    responder.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = PreconnectConfig {
        timeout: Duration::from_millis(200),
        ..Default::default()
    };
    assert_eq!(
        probe(target, "", PROTOCOL_VERSION, "bob", &config).await,
        PreconnectResult::Timeout
    );
}

#[tokio::test]
async fn test_unsendable_target_is_network_error() {
    let target = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));

    let started = Instant::now();
    let result = probe(target, "", PROTOCOL_VERSION, "bob", &config()).await;

    assert_eq!(result, PreconnectResult::NetworkError);
    // Reported at once, not after the deadline.
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_reply_from_other_local_address_is_accepted() {
    let (_tx, rx) = watch::channel(summary(1, 4));
    let policy = JoinPolicy::new("", PROTOCOL_VERSION);
    let responder = PreconnectResponder::spawn(0, policy, rx).unwrap();
    // Sent to the unspecified address; the answer comes from 127.0.0.1.
    let target = SocketAddr::from((Ipv4Addr::UNSPECIFIED, responder.local_addr().port()));

    assert_eq!(
        probe(target, "", PROTOCOL_VERSION, "bob", &config()).await,
        PreconnectResult::Ok
    );
}
