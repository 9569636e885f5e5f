use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{GameError, UserError};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Hard points for the rank. Aces count 11 here; the rules engine
    /// softens them when the hand would bust.
    pub fn points(self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten | Self::Jack | Self::Queen | Self::King => 10,
            Self::Ace => 11,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
        };
        write!(f, "{repr}")
    }
}

/// An immutable playing card.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// Every distinct card in a standard 52 card deck, in suit-major order.
pub fn full_set() -> impl Iterator<Item = Card> {
    Suit::ALL
        .into_iter()
        .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card::new(rank, suit)))
}

/// A single 52 card deck. Cards are dealt off the back of `cards`.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub const SIZE: usize = 52;

    /// A deck whose first dealt cards are `top`, in order. The rest of the
    /// deck is every other card, shuffled.
    pub fn stacked(top: Vec<Card>) -> Self {
        let mut rest: Vec<Card> = full_set().filter(|card| !top.contains(card)).collect();
        rest.shuffle(&mut rand::rng());
        rest.extend(top.into_iter().rev());
        Self { cards: rest }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Put all 52 cards back and shuffle. Only valid between rounds, when
    /// no hands hold cards.
    pub fn reset(&mut self) {
        self.cards = full_set().collect();
        self.shuffle();
    }

    /// Rebuild the deck from every card that isn't currently held in a hand.
    pub fn reset_excluding(&mut self, in_play: &[Card]) {
        self.cards = full_set().filter(|card| !in_play.contains(card)).collect();
        self.shuffle();
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
    }

    /// Reset when fewer than `count` cards remain. Returns whether it did.
    pub fn ensure(&mut self, count: usize) -> bool {
        if self.cards.len() < count {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Deal one card. An empty deck is rebuilt from the cards not in
    /// `in_play` before dealing.
    pub fn deal_card(&mut self, in_play: &[Card]) -> Result<Card, GameError> {
        if self.cards.is_empty() {
            log::info!("deck is empty, reshuffling cards not in play");
            self.reset_excluding(in_play);
        }
        self.cards.pop().ok_or(GameError::DeckExhausted)
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut deck = Self { cards: Vec::new() };
        deck.reset();
        deck
    }
}

/// Type alias for whole chips. Bets and balances never go negative.
pub type Chips = u32;

/// Render a hand the way it appears in snapshots, e.g. `A♠, 10♥`.
pub fn display_hand(cards: &[Card]) -> String {
    cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A seat at the table. Only the coordinator owns these.
#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub name: String,
    pub chips: Chips,
    pub hand: Vec<Card>,
    pub current_bet: Chips,
    pub must_stand: bool,
    /// The participant's connection went away; they're dropped at the next
    /// roster sync.
    pub departed: bool,
}

impl Participant {
    pub fn new(name: &str, chips: Chips) -> Self {
        Self {
            name: name.to_string(),
            chips,
            hand: Vec::new(),
            current_bet: 0,
            must_stand: false,
            departed: false,
        }
    }

    /// Whether the participant put chips down this round.
    pub fn in_round(&self) -> bool {
        self.current_bet > 0
    }

    /// Move a validated bet from the balance into `current_bet`.
    pub fn place_bet(&mut self, amount: i64) -> Result<Chips, UserError> {
        if amount <= 0 {
            return Err(UserError::BetNotPositive);
        }
        let amount = Chips::try_from(amount).map_err(|_| UserError::InsufficientChips {
            chips: self.chips,
        })?;
        if amount > self.chips {
            return Err(UserError::InsufficientChips { chips: self.chips });
        }
        self.chips -= amount;
        self.current_bet = amount;
        Ok(amount)
    }

    /// Double the current bet. Leaves everything untouched when the balance
    /// can't cover it.
    pub fn double_bet(&mut self) -> bool {
        if self.chips < self.current_bet {
            return false;
        }
        self.chips -= self.current_bet;
        self.current_bet *= 2;
        true
    }

    /// Grant `stipend` chips if the participant is broke.
    pub fn grant_stipend(&mut self, stipend: Chips) -> bool {
        if self.chips == 0 {
            self.chips = stipend;
            true
        } else {
            false
        }
    }

    pub fn reset_hand(&mut self) {
        self.hand.clear();
        self.current_bet = 0;
        self.must_stand = false;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dealer {
    pub hand: Vec<Card>,
}

impl Dealer {
    pub fn reset_hand(&mut self) {
        self.hand.clear();
    }
}

/// A participant's move during the action phase.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Hit,
    Stand,
    Double,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::Double => "double",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Action {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hit" | "h" => Ok(Self::Hit),
            "stand" | "s" => Ok(Self::Stand),
            "double" | "d" => Ok(Self::Double),
            other => Err(UserError::InvalidAction(other.to_string())),
        }
    }
}

/// Phases of a round, in order.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Betting,
    Dealing,
    PlayerAction,
    DealerTurn,
    Results,
}

impl Phase {
    /// Whether the dealer's hole card may be shown in this phase.
    pub fn reveals_dealer(self) -> bool {
        matches!(self, Self::DealerTurn | Self::Results)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Lobby => "lobby",
            Self::Betting => "betting",
            Self::Dealing => "dealing",
            Self::PlayerAction => "player action",
            Self::DealerTurn => "dealer turn",
            Self::Results => "results",
        };
        write!(f, "{repr}")
    }
}
