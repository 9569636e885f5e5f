//! Blackjack game engine - entities, rules, and snapshot views.
//!
//! This module provides the pure game layer:
//! - Cards, the deck, participants and the dealer
//! - The rules engine (hand values, outcomes, payouts)
//! - Role-filtered views broadcast after every phase

pub mod constants;
pub mod entities;
pub mod functional;
pub mod views;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use entities::{Action, Chips};

/// Invalid input from a participant. The message is sent back with the
/// re-prompt, so it reads as an instruction.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum UserError {
    #[error("please enter a valid number")]
    InvalidNumber,
    #[error("bet must be a positive number of chips")]
    BetNotPositive,
    #[error("bet can't exceed your {chips} chips")]
    InsufficientChips { chips: Chips },
    #[error("unknown action '{0}', choose hit, stand or double")]
    InvalidAction(String),
    #[error("{0} isn't available right now")]
    ActionNotAvailable(Action),
}

/// Errors raised while running a round.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum GameError {
    #[error("every card is in play")]
    DeckExhausted,
}
