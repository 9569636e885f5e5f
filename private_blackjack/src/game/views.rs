//! Snapshots of the table as shown to participants.
//!
//! Every participant sees the same snapshot. The only hidden information is
//! the dealer's hole card, which stays face-down until the dealer plays.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Card, Chips, Dealer, Participant, Phase, display_hand};

/// How the dealer's face-down card is rendered.
pub const HIDDEN_CARD: &str = "??";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub chips: Chips,
    pub hand: String,
    pub current_bet: Chips,
}

impl From<&Participant> for PlayerView {
    fn from(value: &Participant) -> Self {
        Self {
            name: value.name.clone(),
            chips: value.chips,
            hand: display_hand(&value.hand),
            current_bet: value.current_bet,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DealerView {
    pub hand: String,
}

impl DealerView {
    /// Render the dealer's hand, masking the hole card unless `reveal`.
    pub fn new(cards: &[Card], reveal: bool) -> Self {
        if reveal {
            return Self {
                hand: display_hand(cards),
            };
        }
        let hand = cards
            .iter()
            .enumerate()
            .map(|(idx, card)| {
                if idx == 1 {
                    HIDDEN_CARD.to_string()
                } else {
                    card.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        Self { hand }
    }
}

/// The full session state after a phase transition.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct GameView {
    pub phase: Phase,
    pub round: u32,
    pub current_player: Option<String>,
    pub players: Vec<PlayerView>,
    pub dealer: DealerView,
}

impl GameView {
    pub fn new(
        phase: Phase,
        round: u32,
        current_player: Option<&str>,
        players: &[Participant],
        dealer: &Dealer,
    ) -> Self {
        Self {
            phase,
            round,
            current_player: current_player.map(ToString::to_string),
            players: players.iter().map(PlayerView::from).collect(),
            dealer: DealerView::new(&dealer.hand, phase.reveals_dealer()),
        }
    }
}

impl fmt::Display for GameView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Round {} ({})", self.round, self.phase)?;
        writeln!(f, "  Dealer: {}", self.dealer.hand)?;
        for player in &self.players {
            let marker = if self.current_player.as_deref() == Some(player.name.as_str()) {
                '>'
            } else {
                ' '
            };
            write!(
                f,
                "{marker} {}: {} chips, bet {}",
                player.name, player.chips, player.current_bet
            )?;
            if !player.hand.is_empty() {
                write!(f, ", hand {}", player.hand)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
