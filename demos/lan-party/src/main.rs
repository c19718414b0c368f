use std::time::Duration;

use lanlobby::prelude::*;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// `lan-party host <lobby name> [password]`
    Host { lobby: String, password: String },
    /// `lan-party join <player name> [password]`
    Join { player: String, password: String },
}

fn parse_args(args: &[String]) -> Option<Mode> {
    let password = args.get(2).cloned().unwrap_or_default();
    match (args.first()?.as_str(), args.get(1)) {
        ("host", Some(lobby)) => Some(Mode::Host {
            lobby: lobby.clone(),
            password,
        }),
        ("join", Some(player)) => Some(Mode::Join {
            player: player.clone(),
            password,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Host: advertise, print roster changes, start once two players are in
// ---------------------------------------------------------------------------

async fn host(lobby: String, password: String) -> Result<(), LanLobbyError> {
    let mut ctx = LanLobbyContext::new(LanLobbyConfig {
        player_name: "host".into(),
        ..Default::default()
    })?;

    let hosted = ctx
        .host_lobby(LobbyConfig {
            name: lobby,
            password,
            max_players: 4,
            host_name: "host".into(),
            ..Default::default()
        })
        .await?;
    tracing::info!(session = %hosted.session_addr, "waiting for players");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _roster = ctx.on_roster_changed(move |roster| {
        let _ = tx.send(roster.clone());
    })?;

    while let Some(roster) = rx.recv().await {
        print_roster(&roster);
        if roster.members.len() >= 2 && !roster.state.is_started() {
            // Give latecomers a moment before starting.
            tokio::time::sleep(Duration::from_secs(3)).await;
            ctx.request_start().await?;
        }
        if roster.state.is_started() {
            break;
        }
    }

    tracing::info!("game started");
    tokio::time::sleep(Duration::from_secs(1)).await;
    ctx.shutdown().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Join: browse, probe, join the first lobby that lets us in
// ---------------------------------------------------------------------------

async fn join(player: String, password: String) -> Result<(), LanLobbyError> {
    let mut ctx = LanLobbyContext::new(LanLobbyConfig {
        player_name: player,
        ..Default::default()
    })?;
    ctx.start_browsing()?;

    let session = loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        for event in ctx.drain_discovery_events() {
            tracing::debug!(?event, "discovery");
        }

        let mut target = None;
        for lobby in ctx.list_discovered_lobbies() {
            match ctx.probe_join(&lobby, &password).await {
                PreconnectResult::Ok => {
                    target = Some(lobby.endpoint);
                    break;
                }
                result => tracing::info!(lobby = %lobby.name, %result, "skipping lobby"),
            }
        }
        if let Some(endpoint) = target {
            break endpoint;
        }
    };

    let id = ctx.request_join(session, &password).await?;
    tracing::info!(%id, "joined");
    if let Some(roster) = ctx.roster() {
        print_roster(&roster);
    }

    let client = ctx.client().ok_or(LanLobbyError::NotJoined)?;
    match client.game_starting().await {
        Ok(()) => tracing::info!("host started the game"),
        Err(_) => tracing::info!(state = ?client.state(), "session ended"),
    }
    ctx.shutdown().await;
    Ok(())
}

fn print_roster(roster: &RosterSnapshot) {
    println!(
        "{} [{:?}] {}/{}",
        roster.lobby_name,
        roster.state,
        roster.members.len(),
        roster.max_players
    );
    for member in &roster.members {
        println!("  #{} {} ({}ms)", member.connection_id, member.display_name, member.ping_millis);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lanlobby::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(mode) = parse_args(&args) else {
        eprintln!("usage: lan-party host <lobby> [password] | join <player> [password]");
        std::process::exit(2);
    };

    match mode {
        Mode::Host { lobby, password } => host(lobby, password).await?,
        Mode::Join { player, password } => join(player, password).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_host_with_password() {
        assert_eq!(
            parse_args(&args(&["host", "Friday", "pw"])),
            Some(Mode::Host {
                lobby: "Friday".into(),
                password: "pw".into()
            })
        );
    }

    #[test]
    fn test_parse_join_defaults_to_no_password() {
        assert_eq!(
            parse_args(&args(&["join", "ana"])),
            Some(Mode::Join {
                player: "ana".into(),
                password: String::new()
            })
        );
    }

    #[test]
    fn test_parse_rejects_missing_name() {
        assert_eq!(parse_args(&args(&["host"])), None);
        assert_eq!(parse_args(&args(&[])), None);
        assert_eq!(parse_args(&args(&["spectate", "x"])), None);
    }
}
