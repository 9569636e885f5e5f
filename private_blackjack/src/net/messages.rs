use serde::{Deserialize, Serialize};
use std::fmt;

use super::super::game::views::GameView;

/// Every frame on the wire, in both directions. The `type` field carries
/// the variant name in snake case.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// First frame from a client, asking for a seat.
    Join { name: String },
    /// Accepted join, and any roster change afterwards.
    JoinAck { players: Vec<String> },
    /// The lobby closed and the first round is about to begin.
    Start,
    /// Table snapshot broadcast after every phase transition.
    State(GameView),
    /// The addressed participant must answer with a `bet_response`.
    BetRequest,
    BetResponse { amount: i64 },
    /// The addressed participant must answer with an `action_response`.
    ActionRequest { prompt: String },
    /// The action is kept as text so an unknown action can be re-prompted
    /// rather than dropped as a malformed frame.
    ActionResponse { action: String },
    /// Something the receiving client did was rejected.
    Error { message: String },
    /// An announcement for everyone at the table.
    Info { message: String },
}

/// The discriminator of a [`Message`], used to match replies to requests.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MessageKind {
    Join,
    JoinAck,
    Start,
    State,
    BetRequest,
    BetResponse,
    ActionRequest,
    ActionResponse,
    Error,
    Info,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Join { .. } => MessageKind::Join,
            Self::JoinAck { .. } => MessageKind::JoinAck,
            Self::Start => MessageKind::Start,
            Self::State(_) => MessageKind::State,
            Self::BetRequest => MessageKind::BetRequest,
            Self::BetResponse { .. } => MessageKind::BetResponse,
            Self::ActionRequest { .. } => MessageKind::ActionRequest,
            Self::ActionResponse { .. } => MessageKind::ActionResponse,
            Self::Error { .. } => MessageKind::Error,
            Self::Info { .. } => MessageKind::Info,
        }
    }

    /// Replies the acceptor routes to the participant's queue.
    pub fn is_reply(&self) -> bool {
        matches!(
            self.kind(),
            MessageKind::BetResponse | MessageKind::ActionResponse
        )
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    pub fn info(message: impl fmt::Display) -> Self {
        Self::Info {
            message: message.to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Join => "join",
            Self::JoinAck => "join_ack",
            Self::Start => "start",
            Self::State => "state",
            Self::BetRequest => "bet_request",
            Self::BetResponse => "bet_response",
            Self::ActionRequest => "action_request",
            Self::ActionResponse => "action_response",
            Self::Error => "error",
            Self::Info => "info",
        };
        write!(f, "{repr}")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Join { name } => write!(f, "{name} wants to join"),
            Self::JoinAck { players } => write!(f, "players: {}", players.join(", ")),
            Self::Start => write!(f, "game starting"),
            Self::State(view) => write!(f, "round {} {}", view.round, view.phase),
            Self::BetRequest => write!(f, "place your bet"),
            Self::BetResponse { amount } => write!(f, "bet {amount}"),
            Self::ActionRequest { prompt } => write!(f, "{prompt}"),
            Self::ActionResponse { action } => write!(f, "{action}"),
            Self::Error { message } => write!(f, "error: {message}"),
            Self::Info { message } => write!(f, "{message}"),
        }
    }
}
