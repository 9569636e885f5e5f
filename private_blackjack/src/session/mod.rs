//! Running a blackjack session.

/// Session configuration.
pub mod config;
/// The round state machine.
pub mod coordinator;
/// The input/output capability the coordinator plays through.
pub mod io;
/// Hot-seat play on one terminal.
pub mod terminal;

pub use config::SessionConfig;
pub use coordinator::{Coordinator, RoundSummary, Settlement};
pub use io::{GameIo, IoError, Reply, Request};
pub use terminal::TerminalIo;
