//! # Private Blackjack
//!
//! A turn-based blackjack table for one or more participants, played either
//! hot-seat on one terminal or over TCP with one client per participant.
//!
//! ## Architecture
//!
//! A round moves through fixed phases:
//!
//! - **Betting**: each participant stakes chips, in join order
//! - **Dealing**: two cards each, then two for the dealer (one face down)
//! - **PlayerAction**: each participant hits, stands or doubles down
//! - **DealerTurn**: the dealer draws to 17
//! - **Results**: bets are settled against the dealer
//!
//! The [`session::Coordinator`] owns all game state and drives the phases. It
//! reaches participants only through the [`session::GameIo`] capability, with
//! a terminal implementation ([`session::TerminalIo`]) and a networked one
//! ([`net::network_io::NetworkIo`]) backed by the participant registry.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, participants, the rules engine and snapshot views
//! - [`net`]: Wire protocol, participant registry, acceptor and client
//! - [`session`]: The coordinator and its input providers
//!
//! ## Example
//!
//! ```
//! use private_blackjack::game::{
//!     entities::{Card, Rank, Suit},
//!     functional::hand_value,
//! };
//!
//! let hand = [Card::new(Rank::Ace, Suit::Spade), Card::new(Rank::King, Suit::Heart)];
//! assert_eq!(hand_value(&hand), 21);
//! ```

pub mod game;
pub use game::{
    GameError, UserError,
    entities::{Action, Card, Chips, Deck, Participant, Phase},
    functional::Outcome,
    views::GameView,
};

/// Networking components for client-server communication.
pub mod net;

/// Running a session.
pub mod session;
pub use session::{Coordinator, GameIo, SessionConfig};
