//! Hot-seat play: every participant shares one terminal.

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

use super::io::{GameIo, IoError, Reply, Request};
use crate::game::views::GameView;

/// A [`GameIo`] that prompts on a writer and reads answers, one per line,
/// from a reader. Production uses stdin and stdout.
pub struct TerminalIo<R, W> {
    reader: R,
    writer: W,
    names: Vec<String>,
}

impl TerminalIo<BufReader<Stdin>, Stdout> {
    pub fn stdio(names: Vec<String>) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), names)
    }
}

impl<R, W> TerminalIo<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, names: Vec<String>) -> Self {
        Self {
            reader,
            writer,
            names,
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn write(&mut self, text: &str) -> Result<(), IoError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, IoError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(IoError::Closed);
        }
        Ok(line.trim().to_string())
    }
}

#[async_trait]
impl<R, W> GameIo for TerminalIo<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request(&mut self, name: &str, request: Request) -> Result<Reply, IoError> {
        match request {
            Request::Bet { chips } => {
                self.write(&format!("{name}, place your bet (1-{chips}): "))
                    .await?;
                let line = self.read_line().await?;
                Ok(match line.parse::<i64>() {
                    Ok(amount) => Reply::Bet(amount),
                    Err(_) => Reply::Unparsable(line),
                })
            }
            Request::Action { prompt, .. } => {
                self.write(&format!("{prompt} ")).await?;
                Ok(Reply::Action(self.read_line().await?))
            }
        }
    }

    async fn reject(&mut self, _name: &str, reason: &str) -> Result<(), IoError> {
        self.write(&format!("{reason}\n")).await
    }

    async fn announce(&mut self, text: &str) -> Result<(), IoError> {
        self.write(&format!("{text}\n")).await
    }

    async fn publish(&mut self, view: &GameView) -> Result<(), IoError> {
        self.write(&format!("\n{view}")).await
    }

    async fn roster(&mut self) -> Vec<String> {
        self.names.clone()
    }

    async fn keep_playing(&mut self, _round: u32) -> Result<bool, IoError> {
        self.write("Play another round? (y/n): ").await?;
        let line = self.read_line().await?;
        Ok(matches!(line.to_lowercase().as_str(), "y" | "yes"))
    }
}
