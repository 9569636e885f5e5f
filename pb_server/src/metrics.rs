//! Prometheus metrics for monitoring the blackjack server.
//!
//! Metrics are exposed in Prometheus text format on the `--metrics` address.
//!
//! # Metrics Categories
//!
//! - **Connection Metrics**: Seated participants, joins and departures
//! - **Game Metrics**: Rounds played, bets and payouts, outcomes
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pb_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::active_participants(3);
//! metrics::rounds_played_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use private_blackjack::session::RoundSummary;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Connection Metrics
// ============================================================================

/// Set current registered participants count.
pub fn active_participants(count: usize) {
    metrics::gauge!("active_participants").set(count as f64);
}

/// Increment the roster change counter.
pub fn roster_changes_total(kind: &str) {
    metrics::counter!("roster_changes_total", "kind" => kind.to_string()).increment(1);
}

/// Count joins and departures between two rosters. Returns
/// `(joined, left)`.
pub fn record_roster_change(before: &[String], after: &[String]) -> (usize, usize) {
    let joined = after.iter().filter(|name| !before.contains(name)).count();
    let left = before.iter().filter(|name| !after.contains(name)).count();
    for _ in 0..joined {
        roster_changes_total("join");
    }
    for _ in 0..left {
        roster_changes_total("leave");
    }
    (joined, left)
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment rounds played counter.
pub fn rounds_played_total() {
    metrics::counter!("rounds_played_total").increment(1);
}

/// Record bet size distribution.
pub fn bet_size_chips(size: u32) {
    metrics::histogram!("bet_size_chips").record(f64::from(size));
}

/// Increment settled hands, labelled by outcome.
pub fn outcomes_total(outcome: &str) {
    metrics::counter!("outcomes_total", "outcome" => outcome.to_string()).increment(1);
}

/// Increment chips paid out by the dealer.
pub fn payouts_total(chips: u32) {
    metrics::counter!("payouts_chips_total").increment(u64::from(chips));
}

/// Record everything a finished round reports.
pub fn record_round(summary: &RoundSummary) {
    rounds_played_total();
    for settlement in &summary.settlements {
        bet_size_chips(settlement.bet);
        outcomes_total(&settlement.outcome.to_string());
        payouts_total(settlement.payout);
    }
}
