//! The input/output capability the coordinator plays through.

use async_trait::async_trait;
use thiserror::Error;

use crate::game::{
    entities::{Action, Chips},
    views::GameView,
};

/// Something the coordinator needs one participant to decide.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Choose a stake. `chips` is the participant's balance.
    Bet { chips: Chips },
    /// Choose among `choices`.
    Action { prompt: String, choices: Vec<Action> },
}

/// A participant's raw answer. Validation is the coordinator's job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    Bet(i64),
    Action(String),
    /// Input that couldn't even be read as the requested kind, like a bet
    /// that isn't a number.
    Unparsable(String),
}

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{0} disconnected")]
    Disconnected(String),
    #[error("{0} didn't answer in time")]
    TimedOut(String),
    #[error("input closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IoError {
    /// Errors the coordinator resolves with a default action instead of
    /// ending the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Disconnected(_) | Self::TimedOut(_))
    }
}

/// How the coordinator reaches participants. Implementations decide where
/// prompts go and where answers come from; the coordinator never knows
/// whether it's talking to a terminal or a socket.
#[async_trait]
pub trait GameIo: Send {
    /// Ask `name` for a decision and wait for the answer.
    async fn request(&mut self, name: &str, request: Request) -> Result<Reply, IoError>;

    /// Tell `name` their last answer was refused and why.
    async fn reject(&mut self, name: &str, reason: &str) -> Result<(), IoError>;

    /// Tell everyone something happened.
    async fn announce(&mut self, text: &str) -> Result<(), IoError>;

    /// Show everyone the table.
    async fn publish(&mut self, view: &GameView) -> Result<(), IoError>;

    /// Names of everyone currently able to play, in join order.
    async fn roster(&mut self) -> Vec<String>;

    /// Whether to deal another round after `round` finished.
    async fn keep_playing(&mut self, round: u32) -> Result<bool, IoError>;
}
