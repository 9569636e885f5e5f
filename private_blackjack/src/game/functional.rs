//! The rules engine. Pure functions over hands and bets; no state, no I/O.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::{
    constants::{BLACKJACK, DEALER_STAND_VALUE, DOUBLE_DOWN_MAX, DOUBLE_DOWN_MIN, INITIAL_HAND_SIZE},
    entities::{Action, Card, Chips, Rank},
};

#[derive(Debug, Eq, Error, PartialEq)]
pub enum RulesError {
    #[error("invalid result '{0}', must be win, lose, blackjack or push")]
    UnknownOutcome(String),
}

/// How a participant's hand settled against the dealer's.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Blackjack,
    Push,
    Lose,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Win => "win",
            Self::Blackjack => "blackjack",
            Self::Push => "push",
            Self::Lose => "lose",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Outcome {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(Self::Win),
            "blackjack" => Ok(Self::Blackjack),
            "push" => Ok(Self::Push),
            "lose" => Ok(Self::Lose),
            other => Err(RulesError::UnknownOutcome(other.to_string())),
        }
    }
}

/// Value of a hand and whether an ace is still counted as 11.
///
/// Every ace starts at 11 and is dropped to 1, one at a time, while the
/// total is over 21.
pub fn evaluate(cards: &[Card]) -> (u32, bool) {
    let mut value: u32 = cards.iter().map(|card| card.rank.points()).sum();
    let mut soft_aces = cards.iter().filter(|card| card.rank == Rank::Ace).count();
    while value > BLACKJACK && soft_aces > 0 {
        value -= 10;
        soft_aces -= 1;
    }
    (value, soft_aces > 0)
}

pub fn hand_value(cards: &[Card]) -> u32 {
    evaluate(cards).0
}

pub fn is_soft(cards: &[Card]) -> bool {
    evaluate(cards).1
}

/// A natural: exactly two cards worth 21.
pub fn is_blackjack(cards: &[Card]) -> bool {
    cards.len() == INITIAL_HAND_SIZE && hand_value(cards) == BLACKJACK
}

pub fn is_bust(cards: &[Card]) -> bool {
    hand_value(cards) > BLACKJACK
}

/// Doubling is offered on an unplayed two-card hand worth 9, 10 or 11.
pub fn can_double_down(cards: &[Card]) -> bool {
    cards.len() == INITIAL_HAND_SIZE
        && (DOUBLE_DOWN_MIN..=DOUBLE_DOWN_MAX).contains(&hand_value(cards))
}

/// The dealer draws below 17 and stands on every 17, soft ones included.
pub fn dealer_should_hit(cards: &[Card]) -> bool {
    hand_value(cards) < DEALER_STAND_VALUE
}

pub fn valid_actions(cards: &[Card]) -> Vec<Action> {
    let mut actions = vec![Action::Hit, Action::Stand];
    if can_double_down(cards) {
        actions.push(Action::Double);
    }
    actions
}

/// Total returned to the participant for a settled bet. The bet itself was
/// already taken from their balance, so a push hands it back unchanged.
/// Saturates at `Chips::MAX`.
pub fn calculate_payout(bet: Chips, outcome: Outcome) -> Chips {
    let bet = u64::from(bet);
    let payout = match outcome {
        Outcome::Win => bet * 2,
        Outcome::Blackjack => bet * 5 / 2,
        Outcome::Push => bet,
        Outcome::Lose => 0,
    };
    Chips::try_from(payout).unwrap_or(Chips::MAX)
}

/// [`calculate_payout`] keyed by the outcome's label.
pub fn payout_for_label(bet: Chips, label: &str) -> Result<Chips, RulesError> {
    Ok(calculate_payout(bet, label.parse()?))
}

pub fn determine_outcome(player: &[Card], dealer: &[Card]) -> Outcome {
    let player_blackjack = is_blackjack(player);
    let dealer_blackjack = is_blackjack(dealer);
    match (player_blackjack, dealer_blackjack) {
        (true, false) => return Outcome::Blackjack,
        (true, true) => return Outcome::Push,
        (false, true) => return Outcome::Lose,
        (false, false) => {}
    }

    if is_bust(player) {
        return Outcome::Lose;
    }
    if is_bust(dealer) {
        return Outcome::Win;
    }

    let player_value = hand_value(player);
    let dealer_value = hand_value(dealer);
    match player_value.cmp(&dealer_value) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Less => Outcome::Lose,
        std::cmp::Ordering::Equal => Outcome::Push,
    }
}

/// Outcomes for each hand against the same dealer hand, in the given order.
pub fn determine_winners<'a, I>(hands: I, dealer: &[Card]) -> Vec<Outcome>
where
    I: IntoIterator<Item = &'a [Card]>,
{
    hands
        .into_iter()
        .map(|hand| determine_outcome(hand, dealer))
        .collect()
}
