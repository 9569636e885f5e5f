//! Server side of the blackjack table: configuration, logging, metrics, the
//! lobby and the round loop the `pb_server` binary runs.

pub mod config;
pub mod lobby;
pub mod logging;
pub mod metrics;
pub mod runner;
