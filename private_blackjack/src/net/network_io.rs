use async_trait::async_trait;
use std::time::Duration;

use super::{
    messages::{Message, MessageKind},
    registry::{Registry, RegistryError},
};
use crate::{
    game::views::GameView,
    session::io::{GameIo, IoError, Reply, Request},
};

/// A [`GameIo`] backed by the participant registry. Requests go to one
/// connection and wait on that participant's queue; everything else is
/// broadcast.
pub struct NetworkIo {
    registry: Registry,
    turn_timeout: Option<Duration>,
}

impl NetworkIo {
    pub fn new(registry: Registry, turn_timeout: Option<Duration>) -> Self {
        Self {
            registry,
            turn_timeout,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl From<RegistryError> for IoError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::TimedOut { name, .. } => Self::TimedOut(name),
            RegistryError::Disconnected(name) | RegistryError::UnknownParticipant(name) => {
                Self::Disconnected(name)
            }
            other => Self::Io(std::io::Error::other(other.to_string())),
        }
    }
}

#[async_trait]
impl GameIo for NetworkIo {
    async fn request(&mut self, name: &str, request: Request) -> Result<Reply, IoError> {
        let (outbound, expected) = match request {
            Request::Bet { .. } => (Message::BetRequest, MessageKind::BetResponse),
            Request::Action { prompt, .. } => (
                Message::ActionRequest { prompt },
                MessageKind::ActionResponse,
            ),
        };
        let reply = self
            .registry
            .request_and_wait(name, &outbound, expected, self.turn_timeout)
            .await?;
        match reply {
            Message::BetResponse { amount } => Ok(Reply::Bet(amount)),
            Message::ActionResponse { action } => Ok(Reply::Action(action)),
            other => Ok(Reply::Unparsable(other.to_string())),
        }
    }

    async fn reject(&mut self, name: &str, reason: &str) -> Result<(), IoError> {
        self.registry.send_to(name, &Message::error(reason))?;
        Ok(())
    }

    async fn announce(&mut self, text: &str) -> Result<(), IoError> {
        self.registry.broadcast(&Message::info(text));
        Ok(())
    }

    async fn publish(&mut self, view: &GameView) -> Result<(), IoError> {
        self.registry.broadcast(&Message::State(view.clone()));
        Ok(())
    }

    async fn roster(&mut self) -> Vec<String> {
        self.registry.roster()
    }

    async fn keep_playing(&mut self, round: u32) -> Result<bool, IoError> {
        let connected = self.registry.len();
        log::debug!("round {round} finished with {connected} participants connected");
        Ok(connected > 0)
    }
}
