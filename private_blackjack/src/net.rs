//! Networking layer for client-server communication.
//!
//! This module provides TCP-based networking with a line-delimited JSON
//! protocol. The server runs on tokio, one read loop and one write task
//! per connection.

/// Async TCP client for connecting to a blackjack server.
pub mod client;

/// Error types for frame encoding and decoding.
pub mod errors;

/// Message types for client-server communication protocol.
pub mod messages;

/// The networked input provider the session coordinator talks to.
pub mod network_io;

/// Connection and participant bookkeeping shared by the acceptor and the
/// coordinator.
pub mod registry;

/// Connection acceptor and join handshake.
pub mod server;

/// Utilities for JSON message serialization and line framing.
pub mod utils;
