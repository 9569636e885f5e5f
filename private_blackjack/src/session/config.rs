//! Session configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    constants::{
        DEFAULT_MAX_PLAYERS, DEFAULT_STARTING_CHIPS, DEFAULT_STIPEND, MAX_STARTING_CHIPS,
    },
    entities::Chips,
};

/// Knobs for one coordinator run. The dealer always stands on 17.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Balance a participant is seated with
    pub starting_chips: Chips,

    /// Granted to anyone at 0 chips before betting and after settlement
    pub stipend: Chips,

    /// Maximum number of participants (default: 7)
    pub max_players: usize,

    /// Participants needed before the lobby closes on its own
    pub min_players: usize,

    /// Bound on how long a participant may take to answer. `None` waits
    /// forever.
    pub turn_timeout: Option<Duration>,

    /// Rounds to play before stopping, 0 for unlimited
    pub max_rounds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_chips: DEFAULT_STARTING_CHIPS,
            stipend: DEFAULT_STIPEND,
            max_players: DEFAULT_MAX_PLAYERS,
            min_players: 1,
            turn_timeout: None,
            max_rounds: 0,
        }
    }
}

impl SessionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_players == 0 || self.max_players > DEFAULT_MAX_PLAYERS {
            return Err(format!(
                "Max players must be between 1 and {DEFAULT_MAX_PLAYERS}"
            ));
        }

        if self.min_players == 0 || self.min_players > self.max_players {
            return Err("Min players must be between 1 and max players".to_string());
        }

        if self.starting_chips == 0 {
            return Err("Starting chips must be positive".to_string());
        }

        if self.stipend == 0 {
            return Err("Stipend must be positive".to_string());
        }

        if self.starting_chips > MAX_STARTING_CHIPS || self.stipend > MAX_STARTING_CHIPS {
            return Err(format!(
                "Starting chips and stipend must be at most {MAX_STARTING_CHIPS}"
            ));
        }

        if self.turn_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("Turn timeout must be positive, or unset to wait forever".to_string());
        }

        Ok(())
    }

    /// Whether the session should stop after `round`.
    pub fn rounds_exhausted(&self, round: u32) -> bool {
        self.max_rounds != 0 && round >= self.max_rounds
    }
}
