//! Connection acceptor.
//!
//! Every accepted socket gets a writer task that owns the write half and
//! drains the connection's outbound channel, plus a read loop that performs
//! the join handshake and then routes replies into the participant's queue.

use log::{debug, info, warn};
use std::{io, net::SocketAddr};
use tokio::{
    io::{AsyncBufRead, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
    sync::mpsc,
    task::JoinHandle,
};

use super::{
    messages::Message,
    registry::{ConnectionId, Registry},
    utils,
};
use crate::game::constants::MAX_NAME_LENGTH;

/// Trim a requested name, replace inner whitespace with `_` and cap its
/// length. An empty result means the name is unusable.
pub fn sanitize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect()
}

/// Accept connections forever, one task per connection.
pub async fn serve(listener: TcpListener, registry: Registry) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("accepted connection from {peer}");
        let registry = registry.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, registry).await;
        });
    }
}

/// Bind `addr` and [`serve`] on it.
pub async fn run(addr: SocketAddr, registry: Registry) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    serve(listener, registry).await
}

fn spawn_writer(mut writer: OwnedWriteHalf) -> (mpsc::UnboundedSender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let written = match writer.write_all(frame.as_bytes()).await {
                Ok(()) => writer.flush().await,
                Err(error) => Err(error),
            };
            if let Err(error) = written {
                debug!("write failed, closing: {error}");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });
    (tx, handle)
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, registry: Registry) {
    let (read, write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let (outbound, writer) = spawn_writer(write);
    let id = registry.attach(outbound);

    match handshake(&mut reader, &registry, id).await {
        Ok(name) => {
            info!("{name} joined from {peer}");
            read_loop(&mut reader, &registry, &name).await;
        }
        Err(Some(reason)) => {
            warn!("rejected connection from {peer}: {reason}");
            if let Err(error) = registry.send(id, &Message::error(reason)) {
                debug!("couldn't tell {peer} why: {error}");
            }
        }
        Err(None) => debug!("{peer} left before joining"),
    }

    // Dropping the connection's sender lets the writer drain and exit.
    if let Some(name) = registry.deregister(id) {
        registry.broadcast(&Message::JoinAck {
            players: registry.roster(),
        });
        info!("{name} disconnected");
    }
    if let Err(error) = writer.await {
        warn!("writer task for {peer} failed: {error}");
    }
}

/// Read the first frame and register its name. `Err(None)` means the peer
/// hung up without a word.
async fn handshake<R>(
    reader: &mut R,
    registry: &Registry,
    id: ConnectionId,
) -> Result<String, Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let name = match utils::read_frame::<Message, _>(reader).await {
        Ok(Some(Message::Join { name })) => sanitize_name(&name),
        Ok(Some(other)) => return Err(Some(format!("expected join, got {}", other.kind()))),
        Ok(None) => return Err(None),
        Err(error) => return Err(Some(format!("malformed join: {error}"))),
    };

    let players = registry
        .register(id, &name)
        .map_err(|error| Some(error.to_string()))?;
    registry.broadcast_others(&name, &Message::JoinAck { players });
    Ok(name)
}

async fn read_loop<R>(reader: &mut R, registry: &Registry, name: &str)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match utils::read_frame::<Message, _>(reader).await {
            Ok(Some(message)) if message.is_reply() => registry.enqueue(name, message),
            Ok(Some(message)) => debug!("ignoring {} from {name}", message.kind()),
            Ok(None) => {
                debug!("{name} closed the connection");
                return;
            }
            Err(error) if !error.is_fatal() => {
                warn!("dropping malformed frame from {name}: {error}");
                let reply = Message::error(format!("malformed message: {error}"));
                if let Err(error) = registry.send_to(name, &reply) {
                    debug!("couldn't report malformed frame to {name}: {error}");
                }
            }
            Err(error) => {
                warn!("reading from {name} failed: {error}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::MessageKind;

    #[test]
    fn test_sanitize_trims_and_joins() {
        assert_eq!(sanitize_name("  alice  "), "alice");
        assert_eq!(sanitize_name("big  blind\tbob"), "big_blind_bob");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize_name(""), "");
        assert_eq!(sanitize_name(" \t "), "");
    }

    #[test]
    fn test_sanitize_caps_length() {
        let long = "é".repeat(MAX_NAME_LENGTH + 5);
        assert_eq!(sanitize_name(&long).chars().count(), MAX_NAME_LENGTH);
    }

    #[tokio::test]
    async fn test_handshake_rejects_non_join() {
        let registry = Registry::new(7);
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.attach(tx);
        let mut input: &[u8] = b"{\"type\":\"bet_response\",\"amount\":5}\n";
        let result = handshake(&mut input, &registry, id).await;
        assert_eq!(result, Err(Some("expected join, got bet_response".to_string())));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_handshake_rejects_blank_name() {
        let registry = Registry::new(7);
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.attach(tx);
        let mut input: &[u8] = b"{\"type\":\"join\",\"name\":\"   \"}\n";
        assert!(matches!(
            handshake(&mut input, &registry, id).await,
            Err(Some(_))
        ));
    }

    #[tokio::test]
    async fn test_handshake_acks_with_roster() {
        let registry = Registry::new(7);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.attach(tx);
        let mut input: &[u8] = b"{\"type\":\"join\",\"name\":\" al ice \"}\n";
        assert_eq!(
            handshake(&mut input, &registry, id).await,
            Ok("al_ice".to_string())
        );
        let ack: Message = utils::decode_frame(rx.try_recv().unwrap().as_bytes()).unwrap();
        assert_eq!(
            ack,
            Message::JoinAck {
                players: vec!["al_ice".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_read_loop_routes_replies() {
        let registry = Registry::new(7);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = registry.attach(tx);
        registry.register(id, "alice").unwrap();
        // the join_ack
        rx.try_recv().unwrap();

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .request_and_wait("alice", &Message::BetRequest, MessageKind::BetResponse, None)
                    .await
            })
        };
        let request: Message = utils::decode_frame(rx.recv().await.unwrap().as_bytes()).unwrap();
        assert_eq!(request, Message::BetRequest);

        let mut input: &[u8] =
            b"{\"type\":\"start\"}\nnot json\n{\"type\":\"bet_response\",\"amount\":30}\n";
        read_loop(&mut input, &registry, "alice").await;

        let error: Message = utils::decode_frame(rx.recv().await.unwrap().as_bytes()).unwrap();
        assert!(matches!(error, Message::Error { .. }));
        assert_eq!(
            waiter.await.unwrap().unwrap(),
            Message::BetResponse { amount: 30 }
        );
    }
}
