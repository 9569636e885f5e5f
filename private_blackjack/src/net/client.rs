//! A low-level async blackjack client.
//!
//! Speaks the wire protocol and nothing else, so it doubles as the testing
//! utility for the server and as the transport under the terminal client.

use anyhow::{Error, bail};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use super::{messages::Message, utils};

/// Default timeout for waiting on the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// An async TCP client for a blackjack server.
pub struct Client {
    /// The name the server accepted.
    pub name: String,
    /// Everyone at the table when the server accepted the join.
    pub players: Vec<String>,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect, send `join` and wait for the `join_ack`.
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or if the server rejects the
    /// name.
    pub async fn connect(name: &str, addr: &SocketAddr) -> Result<Self, Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => return Self::join(stream, name).await,
                _ => time::sleep(connect_timeout).await,
            }
        }
        bail!("couldn't connect to {addr} as {name}")
    }

    async fn join(stream: TcpStream, name: &str) -> Result<Self, Error> {
        let (read, writer) = stream.into_split();
        let mut client = Self {
            name: name.to_string(),
            players: Vec::new(),
            reader: BufReader::new(read),
            writer,
        };
        client
            .send(&Message::Join {
                name: name.to_string(),
            })
            .await?;
        match client.recv().await? {
            Message::JoinAck { players } => {
                // The server may have sanitized the requested name; it's
                // always the last to join.
                if let Some(accepted) = players.last() {
                    client.name = accepted.clone();
                }
                client.players = players;
                Ok(client)
            }
            Message::Error { message } => bail!(message),
            other => bail!("expected join_ack, got {}", other.kind()),
        }
    }

    /// Wait for the next message from the server.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, a closed connection or an undecodable
    /// frame.
    pub async fn recv(&mut self) -> Result<Message, Error> {
        match time::timeout(READ_TIMEOUT, utils::read_frame(&mut self.reader)).await {
            Ok(Ok(Some(message))) => Ok(message),
            Ok(Ok(None)) => bail!("server closed the connection"),
            Ok(Err(error)) => bail!(error),
            Err(_) => bail!("timed out waiting for the server"),
        }
    }

    /// Wait for the next message, or `None` when the server hangs up.
    pub async fn next(&mut self) -> Result<Option<Message>, Error> {
        Ok(utils::read_frame(&mut self.reader).await?)
    }

    /// Skip messages until one matches `pred`.
    pub async fn recv_until<F>(&mut self, mut pred: F) -> Result<Message, Error>
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let message = self.recv().await?;
            if pred(&message) {
                return Ok(message);
            }
        }
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), Error> {
        utils::write_frame(&mut self.writer, message).await?;
        Ok(())
    }

    /// Write `line` verbatim, followed by the frame delimiter.
    pub async fn send_raw(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn bet(&mut self, amount: i64) -> Result<(), Error> {
        self.send(&Message::BetResponse { amount }).await
    }

    pub async fn act(&mut self, action: &str) -> Result<(), Error> {
        self.send(&Message::ActionResponse {
            action: action.to_string(),
        })
        .await
    }
}
