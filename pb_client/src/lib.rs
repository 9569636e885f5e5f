//! Internal modules for the blackjack client.
//!
//! This library provides input parsing and table rendering used by the
//! pb_client binary.

pub mod commands;
pub mod display;
