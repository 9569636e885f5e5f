//! Waiting for the table to fill up.

use private_blackjack::net::{messages::Message, registry::Registry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{logging, metrics};

/// Operator command that closes the lobby early.
pub const START_COMMAND: &str = "start";

/// Block until `min_players` have joined, or until the operator types
/// `start` on `console` with at least one participant joined. Returns the
/// roster at that moment. A closed console only disables the command.
pub async fn wait_for_start<R>(registry: &Registry, min_players: usize, console: R) -> Vec<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = console.lines();
    let mut console_open = true;
    let mut seen = registry.roster();
    metrics::record_roster_change(&[], &seen);
    log::info!("waiting for {min_players} participant(s), or type '{START_COMMAND}'");

    loop {
        tokio::select! {
            biased;
            () = registry.wait_for_players(min_players) => break,
            () = registry.roster_changed() => {
                let roster = registry.roster();
                metrics::active_participants(roster.len());
                metrics::record_roster_change(&seen, &roster);
                seen = roster.clone();
                logging::log_session_event(
                    "roster",
                    None,
                    0,
                    &format!("{} waiting: {}", roster.len(), roster.join(", ")),
                );
            }
            line = lines.next_line(), if console_open => match line {
                Ok(Some(line)) => {
                    let command = line.trim();
                    if command.eq_ignore_ascii_case(START_COMMAND) {
                        if registry.is_empty() {
                            log::warn!("nobody has joined yet");
                        } else {
                            break;
                        }
                    } else if !command.is_empty() {
                        log::warn!("unknown command '{command}', type '{START_COMMAND}'");
                    }
                }
                Ok(None) => console_open = false,
                Err(error) => {
                    log::warn!("console unreadable, waiting for players only: {error}");
                    console_open = false;
                }
            },
        }
    }

    let roster = registry.roster();
    metrics::active_participants(roster.len());
    metrics::record_roster_change(&seen, &roster);
    roster
}

/// Close the lobby and tell everyone the first round is coming.
pub fn announce_start(registry: &Registry) -> usize {
    let roster = registry.roster();
    logging::log_session_event(
        "start",
        None,
        0,
        &format!("starting with {}", roster.join(", ")),
    );
    registry.broadcast(&Message::Start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{
        io::{AsyncWriteExt, BufReader},
        sync::mpsc,
        time::timeout,
    };

    fn join(registry: &Registry, name: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.attach(tx);
        registry.register(id, name).unwrap();
        rx.try_recv().unwrap();
        rx
    }

    #[tokio::test]
    async fn test_lobby_closes_at_min_players() {
        let registry = Registry::new(4);
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { wait_for_start(&registry, 2, &b""[..]).await })
        };

        let _alice = join(&registry, "alice");
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        let _bob = join(&registry, "bob");

        let roster = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(roster, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_start_command_closes_lobby_early() {
        let registry = Registry::new(4);
        let _alice = join(&registry, "alice");

        let roster = timeout(
            Duration::from_secs(1),
            wait_for_start(&registry, 3, &b"hello\n START \n"[..]),
        )
        .await
        .unwrap();
        assert_eq!(roster, ["alice"]);
    }

    #[tokio::test]
    async fn test_start_command_ignored_while_empty() {
        let registry = Registry::new(4);
        let (console, mut operator) = tokio::io::duplex(64);
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(
                async move { wait_for_start(&registry, 1, BufReader::new(console)).await },
            )
        };

        operator.write_all(b"start\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let _alice = join(&registry, "alice");
        let roster = timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(roster, ["alice"]);
    }

    #[tokio::test]
    async fn test_announce_start_reaches_everyone() {
        let registry = Registry::new(4);
        let mut alice = join(&registry, "alice");
        let mut bob = join(&registry, "bob");

        assert_eq!(announce_start(&registry), 2);
        for rx in [&mut alice, &mut bob] {
            assert!(rx.try_recv().unwrap().contains("\"start\""));
        }
    }
}
