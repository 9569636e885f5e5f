//! The participant registry.
//!
//! Maps connections to display names and owns one inbound queue per
//! participant. Connection read loops produce into the queues; the
//! coordinator consumes from them through [`Registry::request_and_wait`].
//! That producer/consumer boundary is the only state shared between tasks.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};

use super::{
    errors::CodecError,
    messages::{Message, MessageKind},
    utils,
};

/// Opaque handle for an accepted connection.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Encoded frames waiting to be written to a connection.
pub type Outbound = mpsc::UnboundedSender<String>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a name is required")]
    EmptyName,
    #[error("the name '{0}' is already taken")]
    DuplicateName(String),
    #[error("the table is full ({0} players)")]
    SessionFull(usize),
    #[error("connection {0} is not attached")]
    UnknownConnection(ConnectionId),
    #[error("connection already joined as {0}")]
    AlreadyJoined(String),
    #[error("{0} is not registered")]
    UnknownParticipant(String),
    #[error("{0} disconnected")]
    Disconnected(String),
    #[error("{name} didn't answer within {}s", waited.as_secs())]
    TimedOut { name: String, waited: Duration },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

struct Connection {
    name: Option<String>,
    outbound: Outbound,
}

/// A participant's inbound queue. The receiver sits behind an async mutex
/// that the coordinator holds for the whole request, so a participant can
/// never have two requests outstanding.
struct Queue {
    sender: mpsc::UnboundedSender<Message>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<Message>>>,
}

impl Queue {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(AsyncMutex::new(receiver)),
        }
    }
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    connections: HashMap<ConnectionId, Connection>,
    /// Registered participants in join order.
    roster: Vec<(String, ConnectionId)>,
    queues: HashMap<String, Queue>,
}

impl Inner {
    fn names(&self) -> Vec<String> {
        self.roster.iter().map(|(name, _)| name.clone()).collect()
    }

    fn outbound_for(&self, name: &str) -> Option<&Outbound> {
        let (_, id) = self.roster.iter().find(|(n, _)| n == name)?;
        self.connections.get(id).map(|conn| &conn.outbound)
    }
}

/// Shared handle to the registry. Cloning is cheap; every clone sees the
/// same connections.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<Inner>>,
    roster_changed: Arc<Notify>,
    max_players: usize,
}

impl Registry {
    pub fn new(max_players: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            roster_changed: Arc::new(Notify::new()),
            max_players,
        }
    }

    // The lock is never held across an await and nothing panics while
    // holding it, so a poisoned lock still guards consistent data.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a freshly accepted connection that hasn't joined yet.
    pub fn attach(&self, outbound: Outbound) -> ConnectionId {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = ConnectionId(inner.next_id);
        inner.connections.insert(
            id,
            Connection {
                name: None,
                outbound,
            },
        );
        id
    }

    /// Bind a name to an attached connection, create its queue and send it
    /// a `join_ack`. Returns the roster in join order.
    pub fn register(&self, id: ConnectionId, name: &str) -> Result<Vec<String>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let roster = {
            let mut inner = self.lock();
            match inner.connections.get(&id) {
                None => return Err(RegistryError::UnknownConnection(id)),
                Some(Connection {
                    name: Some(existing),
                    ..
                }) => return Err(RegistryError::AlreadyJoined(existing.clone())),
                Some(_) => {}
            }
            if inner.queues.contains_key(name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
            if inner.roster.len() >= self.max_players {
                return Err(RegistryError::SessionFull(self.max_players));
            }
            let mut players = inner.names();
            players.push(name.to_string());
            // The ack goes out under the lock so no other roster update
            // can reach this connection ahead of it.
            let ack = utils::encode_frame(&Message::JoinAck {
                players: players.clone(),
            })?;
            if let Some(conn) = inner.connections.get_mut(&id) {
                conn.name = Some(name.to_string());
                if conn.outbound.send(ack).is_err() {
                    debug!("connection {id} closed before its join_ack");
                }
            }
            inner.roster.push((name.to_string(), id));
            inner.queues.insert(name.to_string(), Queue::new());
            players
        };
        info!("{name} joined on connection {id}");
        self.roster_changed.notify_waiters();
        Ok(roster)
    }

    /// Forget a connection, its name and its queue. Safe to call more than
    /// once. Returns the participant name if the connection had joined.
    pub fn deregister(&self, id: ConnectionId) -> Option<String> {
        let name = {
            let mut inner = self.lock();
            let conn = inner.connections.remove(&id)?;
            let name = conn.name?;
            inner.roster.retain(|(n, _)| *n != name);
            // Dropping the queue's sender wakes a coordinator waiting on it.
            inner.queues.remove(&name);
            name
        };
        info!("{name} left (connection {id})");
        self.roster_changed.notify_waiters();
        Some(name)
    }

    /// Push a reply into a participant's queue. Late messages for someone
    /// who already left are dropped.
    pub fn enqueue(&self, name: &str, message: Message) {
        let inner = self.lock();
        match inner.queues.get(name) {
            Some(queue) => {
                if queue.sender.send(message).is_err() {
                    warn!("queue for {name} is closed, dropping message");
                }
            }
            None => warn!("dropping {} for unknown participant {name}", message.kind()),
        }
    }

    /// Send directly to a connection, joined or not.
    pub fn send(&self, id: ConnectionId, message: &Message) -> Result<(), RegistryError> {
        let frame = utils::encode_frame(message)?;
        let inner = self.lock();
        let conn = inner
            .connections
            .get(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        conn.outbound
            .send(frame)
            .map_err(|_| RegistryError::Disconnected(id.to_string()))
    }

    /// Send to a registered participant by name.
    pub fn send_to(&self, name: &str, message: &Message) -> Result<(), RegistryError> {
        let frame = utils::encode_frame(message)?;
        let inner = self.lock();
        let outbound = inner
            .outbound_for(name)
            .ok_or_else(|| RegistryError::UnknownParticipant(name.to_string()))?;
        outbound
            .send(frame)
            .map_err(|_| RegistryError::Disconnected(name.to_string()))
    }

    /// Send to every registered participant. A recipient that can't be
    /// reached is logged and skipped. Returns how many were reached.
    pub fn broadcast(&self, message: &Message) -> usize {
        self.broadcast_except(None, message)
    }

    /// [`Registry::broadcast`] to everyone but `name`.
    pub fn broadcast_others(&self, name: &str, message: &Message) -> usize {
        self.broadcast_except(Some(name), message)
    }

    fn broadcast_except(&self, skip: Option<&str>, message: &Message) -> usize {
        let frame = match utils::encode_frame(message) {
            Ok(frame) => frame,
            Err(error) => {
                warn!("failed to encode {} for broadcast: {error}", message.kind());
                return 0;
            }
        };
        let inner = self.lock();
        let mut delivered = 0;
        for (name, id) in &inner.roster {
            if skip == Some(name.as_str()) {
                continue;
            }
            let Some(conn) = inner.connections.get(id) else {
                continue;
            };
            match conn.outbound.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => warn!("failed to send {} to {name}", message.kind()),
            }
        }
        delivered
    }

    /// Registered participant names in join order.
    pub fn roster(&self) -> Vec<String> {
        self.lock().names()
    }

    pub fn len(&self) -> usize {
        self.lock().roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().queues.contains_key(name)
    }

    /// Resolve once at least `count` participants are registered.
    pub async fn wait_for_players(&self, count: usize) {
        loop {
            let changed = self.roster_changed.notified();
            if self.len() >= count {
                return;
            }
            changed.await;
        }
    }

    /// Resolve on the next join or departure.
    pub async fn roster_changed(&self) {
        self.roster_changed.notified().await;
    }

    /// Send `outbound` to `name` and wait for a reply of kind `expected`.
    ///
    /// Anything else that shows up in the queue meanwhile is discarded, as
    /// are replies left over from an earlier request that timed out.
    /// Replies carry no request id: they're matched to this request only by
    /// who sent them and their kind.
    pub async fn request_and_wait(
        &self,
        name: &str,
        outbound: &Message,
        expected: MessageKind,
        timeout: Option<Duration>,
    ) -> Result<Message, RegistryError> {
        let receiver = {
            let inner = self.lock();
            let queue = inner
                .queues
                .get(name)
                .ok_or_else(|| RegistryError::UnknownParticipant(name.to_string()))?;
            Arc::clone(&queue.receiver)
        };
        let mut queue = receiver.lock().await;

        while let Ok(stale) = queue.try_recv() {
            debug!("discarding stale {} from {name}", stale.kind());
        }

        self.send_to(name, outbound)?;
        debug!("sent {} to {name}, awaiting {expected}", outbound.kind());

        let wait = async {
            loop {
                match queue.recv().await {
                    Some(reply) if reply.kind() == expected => return Ok(reply),
                    Some(other) => {
                        debug!("ignoring {} from {name} while awaiting {expected}", other.kind());
                    }
                    None => return Err(RegistryError::Disconnected(name.to_string())),
                }
            }
        };

        match timeout {
            Some(waited) => tokio::time::timeout(waited, wait).await.map_err(|_| {
                RegistryError::TimedOut {
                    name: name.to_string(),
                    waited,
                }
            })?,
            None => wait.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::utils::decode_frame;

    fn connect(registry: &Registry) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (registry.attach(tx), rx)
    }

    fn join(registry: &Registry, name: &str) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (id, mut rx) = connect(registry);
        registry.register(id, name).unwrap();
        assert!(matches!(next(&mut rx), Message::JoinAck { .. }));
        (id, rx)
    }

    fn next(rx: &mut mpsc::UnboundedReceiver<String>) -> Message {
        let frame = rx.try_recv().unwrap();
        decode_frame(frame.as_bytes()).unwrap()
    }

    #[test]
    fn test_register_returns_roster_in_join_order() {
        let registry = Registry::new(7);
        let (alice, _) = connect(&registry);
        let (bob, _) = connect(&registry);
        assert_eq!(registry.register(alice, "alice").unwrap(), vec!["alice"]);
        assert_eq!(
            registry.register(bob, "bob").unwrap(),
            vec!["alice", "bob"]
        );
    }

    #[test]
    fn test_register_acks_the_joiner() {
        let registry = Registry::new(7);
        join(&registry, "alice");
        let (bob, mut rx) = connect(&registry);
        registry.register(bob, "bob").unwrap();
        assert_eq!(
            next(&mut rx),
            Message::JoinAck {
                players: vec!["alice".to_string(), "bob".to_string()]
            }
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = Registry::new(7);
        join(&registry, "alice");
        join(&registry, "bob");
        let (carol, _) = connect(&registry);
        assert!(matches!(
            registry.register(carol, "alice"),
            Err(RegistryError::DuplicateName(name)) if name == "alice"
        ));
        assert_eq!(registry.roster(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_register_twice_on_one_connection() {
        let registry = Registry::new(7);
        let (id, _) = join(&registry, "alice");
        assert!(matches!(
            registry.register(id, "alias"),
            Err(RegistryError::AlreadyJoined(_))
        ));
    }

    #[test]
    fn test_session_full() {
        let registry = Registry::new(1);
        join(&registry, "alice");
        let (bob, _) = connect(&registry);
        assert!(matches!(
            registry.register(bob, "bob"),
            Err(RegistryError::SessionFull(1))
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = Registry::new(7);
        let (id, _) = connect(&registry);
        assert!(matches!(
            registry.register(id, ""),
            Err(RegistryError::EmptyName)
        ));
    }

    #[test]
    fn test_deregister_is_idempotent() {
        let registry = Registry::new(7);
        let (id, _) = join(&registry, "alice");
        assert_eq!(registry.deregister(id), Some("alice".to_string()));
        assert_eq!(registry.deregister(id), None);
        assert!(registry.is_empty());
        assert!(!registry.contains("alice"));
    }

    #[test]
    fn test_name_reusable_after_deregister() {
        let registry = Registry::new(7);
        let (id, _) = join(&registry, "alice");
        registry.deregister(id);
        let (again, _) = connect(&registry);
        assert!(registry.register(again, "alice").is_ok());
    }

    #[test]
    fn test_broadcast_skips_failed_recipient() {
        let registry = Registry::new(7);
        let (_, mut alice) = join(&registry, "alice");
        let (_, bob) = join(&registry, "bob");
        let (_, mut carol) = join(&registry, "carol");
        drop(bob);

        assert_eq!(registry.broadcast(&Message::Start), 2);
        assert_eq!(next(&mut alice), Message::Start);
        assert_eq!(next(&mut carol), Message::Start);
    }

    #[test]
    fn test_broadcast_excludes_unjoined_connections() {
        let registry = Registry::new(7);
        let (_, mut lurker) = connect(&registry);
        let (_, mut alice) = join(&registry, "alice");
        assert_eq!(registry.broadcast(&Message::Start), 1);
        assert!(lurker.try_recv().is_err());
        assert_eq!(next(&mut alice), Message::Start);
    }

    #[test]
    fn test_broadcast_others_skips_named() {
        let registry = Registry::new(7);
        let (_, mut alice) = join(&registry, "alice");
        let (_, mut bob) = join(&registry, "bob");
        assert_eq!(registry.broadcast_others("bob", &Message::Start), 1);
        assert_eq!(next(&mut alice), Message::Start);
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn test_enqueue_unknown_name_is_ignored() {
        let registry = Registry::new(7);
        registry.enqueue("ghost", Message::BetResponse { amount: 10 });
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_request_and_wait_returns_expected_reply() {
        let registry = Registry::new(7);
        let (_, mut alice) = join(&registry, "alice");
        registry.enqueue(
            "alice",
            Message::ActionResponse {
                action: "stale".to_string(),
            },
        );

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .request_and_wait(
                        "alice",
                        &Message::BetRequest,
                        MessageKind::BetResponse,
                        None,
                    )
                    .await
            })
        };

        // Wait until the request went out before answering it.
        let frame = loop {
            if let Ok(frame) = alice.try_recv() {
                break frame;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(
            decode_frame::<Message>(frame.as_bytes()).unwrap(),
            Message::BetRequest
        );

        registry.enqueue(
            "alice",
            Message::ActionResponse {
                action: "hit".to_string(),
            },
        );
        registry.enqueue("alice", Message::BetResponse { amount: 25 });

        let reply = waiter.await.unwrap().unwrap();
        assert_eq!(reply, Message::BetResponse { amount: 25 });
    }

    async fn next_async(rx: &mut mpsc::UnboundedReceiver<String>) -> Message {
        let frame = rx.recv().await.unwrap();
        decode_frame(frame.as_bytes()).unwrap()
    }

    fn spawn_bet_request(
        registry: &Registry,
        name: &str,
    ) -> tokio::task::JoinHandle<Result<Message, RegistryError>> {
        let registry = registry.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            registry
                .request_and_wait(&name, &Message::BetRequest, MessageKind::BetResponse, None)
                .await
        })
    }

    #[tokio::test]
    async fn test_request_and_wait_reports_disconnect() {
        let registry = Registry::new(7);
        let (id, mut alice) = join(&registry, "alice");

        let waiter = spawn_bet_request(&registry, "alice");
        assert_eq!(next_async(&mut alice).await, Message::BetRequest);
        registry.deregister(id);

        assert!(matches!(
            waiter.await.unwrap(),
            Err(RegistryError::Disconnected(name)) if name == "alice"
        ));
    }

    #[tokio::test]
    async fn test_request_and_wait_times_out() {
        let registry = Registry::new(7);
        let (_id, _rx) = join(&registry, "alice");
        let result = registry
            .request_and_wait(
                "alice",
                &Message::BetRequest,
                MessageKind::BetResponse,
                Some(Duration::from_millis(20)),
            )
            .await;
        assert!(matches!(result, Err(RegistryError::TimedOut { .. })));
    }

    #[tokio::test]
    async fn test_late_reply_after_timeout_is_discarded() {
        let registry = Registry::new(7);
        let (_id, mut alice) = join(&registry, "alice");
        let _ = registry
            .request_and_wait(
                "alice",
                &Message::BetRequest,
                MessageKind::BetResponse,
                Some(Duration::from_millis(10)),
            )
            .await;
        assert_eq!(next(&mut alice), Message::BetRequest);
        // The answer to the expired request arrives late.
        registry.enqueue("alice", Message::BetResponse { amount: 999 });

        let waiter = spawn_bet_request(&registry, "alice");
        // The queue is drained before the request goes out.
        assert_eq!(next_async(&mut alice).await, Message::BetRequest);
        registry.enqueue("alice", Message::BetResponse { amount: 10 });
        assert_eq!(
            waiter.await.unwrap().unwrap(),
            Message::BetResponse { amount: 10 }
        );
    }

    #[tokio::test]
    async fn test_unknown_participant_request() {
        let registry = Registry::new(7);
        let result = registry
            .request_and_wait("ghost", &Message::BetRequest, MessageKind::BetResponse, None)
            .await;
        assert!(matches!(result, Err(RegistryError::UnknownParticipant(_))));
    }

    #[tokio::test]
    async fn test_one_outstanding_request_per_participant() {
        let registry = Registry::new(7);
        let (_, mut alice) = join(&registry, "alice");

        let first = spawn_bet_request(&registry, "alice");
        let second = spawn_bet_request(&registry, "alice");
        assert_eq!(next_async(&mut alice).await, Message::BetRequest);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // The second request waits until the first is answered.
        assert!(alice.try_recv().is_err());

        registry.enqueue("alice", Message::BetResponse { amount: 1 });
        assert_eq!(next_async(&mut alice).await, Message::BetRequest);
        registry.enqueue("alice", Message::BetResponse { amount: 2 });

        let mut amounts = Vec::new();
        for handle in [first, second] {
            match handle.await.unwrap().unwrap() {
                Message::BetResponse { amount } => amounts.push(amount),
                other => panic!("unexpected reply {other:?}"),
            }
        }
        amounts.sort_unstable();
        assert_eq!(amounts, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_wait_for_players() {
        let registry = Registry::new(7);
        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_for_players(2).await })
        };
        join(&registry, "alice");
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        join(&registry, "bob");
        waiter.await.unwrap();
    }
}
