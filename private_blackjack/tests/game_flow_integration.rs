//! Integration tests for networked play.
//!
//! Every test binds a real listener on an ephemeral port, runs the acceptor
//! (and usually a coordinator) in the background and drives it with
//! [`Client`]s.

use private_blackjack::{
    game::{
        entities::{Card, Deck, Phase, Rank, Suit},
        views::GameView,
    },
    net::{client::Client, messages::Message, network_io::NetworkIo, registry::Registry, server},
    session::{Coordinator, SessionConfig},
};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Run an acceptor on a random port.
async fn start_server(max_players: usize) -> (SocketAddr, Registry) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Registry::new(max_players);
    tokio::spawn(server::serve(listener, registry.clone()));
    (addr, registry)
}

/// Start a coordinator once `players` have joined.
fn start_session(
    registry: &Registry,
    players: usize,
    deck: Deck,
    max_rounds: u32,
) -> JoinHandle<u32> {
    let registry = registry.clone();
    tokio::spawn(async move {
        registry.wait_for_players(players).await;
        registry.broadcast(&Message::Start);
        let config = SessionConfig {
            max_rounds,
            turn_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let io = NetworkIo::new(registry, config.turn_timeout);
        let mut coordinator = Coordinator::with_deck(io, config, deck);
        coordinator.run().await.unwrap()
    })
}

fn card(rank: Rank, suit: Suit) -> Card {
    Card::new(rank, suit)
}

async fn final_state(client: &mut Client) -> GameView {
    match client
        .recv_until(|msg| matches!(msg, Message::State(view) if view.phase == Phase::Results))
        .await
        .unwrap()
    {
        Message::State(view) => view,
        other => panic!("expected state, got {other:?}"),
    }
}

async fn wait_for_roster(registry: &Registry, len: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.len() != len {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_join_ack_and_roster_broadcast() {
    let (addr, registry) = start_server(7).await;

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    assert_eq!(alice.players, vec!["alice"]);

    let bob = Client::connect("bob", &addr).await.unwrap();
    assert_eq!(bob.players, vec!["alice", "bob"]);

    assert_eq!(
        alice.recv().await.unwrap(),
        Message::JoinAck {
            players: vec!["alice".to_string(), "bob".to_string()]
        }
    );
    assert_eq!(registry.roster(), vec!["alice", "bob"]);

    drop(bob);
    assert_eq!(
        alice.recv().await.unwrap(),
        Message::JoinAck {
            players: vec!["alice".to_string()]
        }
    );
}

#[tokio::test]
async fn test_duplicate_name_is_rejected_and_closed() {
    let (addr, registry) = start_server(7).await;
    let _alice = Client::connect("alice", &addr).await.unwrap();
    let _bob = Client::connect("bob", &addr).await.unwrap();

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write
        .write_all(b"{\"type\":\"join\",\"name\":\"alice\"}\n")
        .await
        .unwrap();
    let mut reader = BufReader::new(read);

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let reply: Message = serde_json::from_str(&line).unwrap();
    assert!(matches!(reply, Message::Error { message } if message.contains("already taken")));

    // The server hangs up after the error.
    line.clear();
    assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);
    assert_eq!(registry.roster(), vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_duplicate_name_through_client() {
    let (addr, _registry) = start_server(7).await;
    let _alice = Client::connect("alice", &addr).await.unwrap();
    let err = Client::connect("alice", &addr).await.err().unwrap();
    assert!(err.to_string().contains("already taken"));
}

#[tokio::test]
async fn test_malformed_join_closes_connection() {
    let (addr, registry) = start_server(7).await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(b"{\"name\":\"alice\"}\n").await.unwrap();
    let mut reader = BufReader::new(read);

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let reply: Message = serde_json::from_str(&line).unwrap();
    assert!(matches!(reply, Message::Error { .. }));
    line.clear();
    assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_session_full() {
    let (addr, _registry) = start_server(1).await;
    let _alice = Client::connect("alice", &addr).await.unwrap();
    let err = Client::connect("bob", &addr).await.err().unwrap();
    assert!(err.to_string().contains("full"));
}

#[tokio::test]
async fn test_join_name_is_sanitized() {
    let (addr, _registry) = start_server(7).await;
    let alice = Client::connect("  alice   smith ", &addr).await.unwrap();
    assert_eq!(alice.name, "alice_smith");
}

#[tokio::test]
async fn test_single_player_round() {
    let (addr, registry) = start_server(7).await;
    let deck = Deck::stacked(vec![
        card(Rank::Ten, Suit::Spade),
        card(Rank::Nine, Suit::Spade),
        card(Rank::Ten, Suit::Club),
        card(Rank::Seven, Suit::Club),
    ]);
    let session = start_session(&registry, 1, deck, 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    alice
        .recv_until(|msg| *msg == Message::Start)
        .await
        .unwrap();
    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(100).await.unwrap();

    let prompt = alice
        .recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
    assert!(matches!(prompt, Message::ActionRequest { prompt } if prompt.contains("10♠, 9♠")));
    alice.act("stand").await.unwrap();

    let view = final_state(&mut alice).await;
    assert_eq!(view.dealer.hand, "10♣, 7♣");
    assert_eq!(view.players[0].chips, 1100);
    assert_eq!(session.await.unwrap(), 1);
}

#[tokio::test]
async fn test_hole_card_masked_on_the_wire() {
    let (addr, registry) = start_server(7).await;
    let deck = Deck::stacked(vec![
        card(Rank::Ten, Suit::Spade),
        card(Rank::Nine, Suit::Spade),
        card(Rank::King, Suit::Club),
        card(Rank::Seven, Suit::Diamond),
    ]);
    let _session = start_session(&registry, 1, deck, 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(10).await.unwrap();

    let dealt = alice
        .recv_until(|msg| matches!(msg, Message::State(view) if view.phase == Phase::Dealing))
        .await
        .unwrap();
    let Message::State(view) = dealt else {
        unreachable!()
    };
    assert_eq!(view.dealer.hand, "K♣, ??");
    assert_eq!(view.players[0].hand, "10♠, 9♠");
}

#[tokio::test]
async fn test_invalid_bet_is_reprompted() {
    let (addr, registry) = start_server(7).await;
    let _session = start_session(&registry, 1, Deck::default(), 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(5000).await.unwrap();

    let error = alice
        .recv_until(|msg| matches!(msg, Message::Error { .. }))
        .await
        .unwrap();
    assert_eq!(error, Message::error("bet can't exceed your 1000 chips"));
    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(10).await.unwrap();
    alice
        .recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection() {
    let (addr, registry) = start_server(7).await;
    let _session = start_session(&registry, 1, Deck::default(), 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.send_raw("{\"type\":\"split\"}").await.unwrap();
    alice.send_raw("not even json").await.unwrap();

    for _ in 0..2 {
        let error = alice
            .recv_until(|msg| matches!(msg, Message::Error { .. }))
            .await
            .unwrap();
        assert!(matches!(error, Message::Error { message } if message.starts_with("malformed")));
    }

    // Still seated and still being waited on.
    alice.bet(25).await.unwrap();
    let info = alice
        .recv_until(|msg| matches!(msg, Message::Info { .. }))
        .await
        .unwrap();
    assert_eq!(info, Message::info("alice bets 25."));
}

#[tokio::test]
async fn test_two_players_take_turns_in_join_order() {
    let (addr, registry) = start_server(7).await;
    let deck = Deck::stacked(vec![
        card(Rank::Ace, Suit::Spade),
        card(Rank::King, Suit::Heart),
        card(Rank::Nine, Suit::Club),
        card(Rank::Eight, Suit::Club),
        card(Rank::Ten, Suit::Diamond),
        card(Rank::Seven, Suit::Heart),
    ]);
    let session = start_session(&registry, 2, deck, 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    let mut bob = Client::connect("bob", &addr).await.unwrap();

    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(50).await.unwrap();
    bob.recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    bob.bet(100).await.unwrap();

    alice
        .recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
    alice.act("stand").await.unwrap();
    bob.recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
    bob.act("stand").await.unwrap();

    let view = final_state(&mut bob).await;
    let chips: Vec<u32> = view.players.iter().map(|p| p.chips).collect();
    assert_eq!(chips, vec![1075, 1000]);
    assert_eq!(session.await.unwrap(), 1);
}

#[tokio::test]
async fn test_disconnect_mid_turn_lets_the_round_finish() {
    let (addr, registry) = start_server(7).await;
    let session = start_session(&registry, 2, Deck::default(), 1);

    let mut alice = Client::connect("alice", &addr).await.unwrap();
    let mut bob = Client::connect("bob", &addr).await.unwrap();

    alice
        .recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    alice.bet(50).await.unwrap();
    bob.recv_until(|msg| *msg == Message::BetRequest)
        .await
        .unwrap();
    bob.bet(50).await.unwrap();

    alice
        .recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
    drop(alice);
    wait_for_roster(&registry, 1).await;

    bob.recv_until(|msg| matches!(msg, Message::ActionRequest { .. }))
        .await
        .unwrap();
    bob.act("stand").await.unwrap();

    let view = final_state(&mut bob).await;
    // Alice stood by default and her hand was still settled.
    assert_eq!(view.players.len(), 2);
    assert_eq!(session.await.unwrap(), 1);
}
