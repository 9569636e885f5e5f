//! Structured logging configuration.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! picks those records up too.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the RUST_LOG env var, defaulting to
/// `info`.
///
/// # Example
///
/// ```no_run
/// use pb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a change at the table with structured data
///
/// # Example
///
/// ```
/// use pb_server::logging::log_session_event;
///
/// log_session_event("join", Some("alice"), 1, "alice took a seat");
/// ```
pub fn log_session_event(event_type: &str, name: Option<&str>, round: u32, message: &str) {
    tracing::info!(
        event_type = event_type,
        participant = name,
        round = round,
        "SESSION: {}",
        message
    );
}

/// Log one participant's settlement
pub fn log_settlement(round: u32, name: &str, outcome: &str, bet: u32, payout: u32) {
    tracing::info!(
        round = round,
        participant = name,
        outcome = outcome,
        bet = bet,
        payout = payout,
        "Settled"
    );
}

/// Log how long a round took, warning on slow ones
pub fn log_round_duration(round: u32, duration_ms: u64) {
    if duration_ms > 60_000 {
        tracing::warn!(round = round, duration_ms = duration_ms, "Slow round");
    } else {
        tracing::debug!(round = round, duration_ms = duration_ms, "Round finished");
    }
}
