//! Table constants shared by the rules engine and the coordinator.

use super::entities::Chips;

/// The dealer keeps drawing while their hand is worth less than this.
pub const DEALER_STAND_VALUE: u32 = 17;

/// Anything above this is a bust.
pub const BLACKJACK: u32 = 21;

/// Two-card totals that allow a double down.
pub const DOUBLE_DOWN_MIN: u32 = 9;
pub const DOUBLE_DOWN_MAX: u32 = 11;

/// Chips a new participant sits down with.
pub const DEFAULT_STARTING_CHIPS: Chips = 1000;

/// Largest configurable starting balance or stipend. A blackjack payout on
/// it still fits in `Chips`.
pub const MAX_STARTING_CHIPS: Chips = 1_000_000_000;

/// Chips granted to a participant that has run dry.
pub const DEFAULT_STIPEND: Chips = 100;

/// Enough seats that a 52 card deck always covers the opening deal.
pub const DEFAULT_MAX_PLAYERS: usize = 7;

/// Cards dealt to every seat (and the dealer) at the start of a round.
pub const INITIAL_HAND_SIZE: usize = 2;

/// Maximum length of a participant's display name.
pub const MAX_NAME_LENGTH: usize = 32;
