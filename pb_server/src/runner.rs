//! Playing rounds with the server's logging and metrics around them.

use private_blackjack::session::{Coordinator, GameIo, IoError};
use std::time::Instant;

use crate::{logging, metrics};

/// Play rounds until the coordinator runs out of participants, hits the
/// round limit or its input says stop. Returns how many rounds were played.
pub async fn play_session<I: GameIo>(coordinator: &mut Coordinator<I>) -> Result<u32, IoError> {
    let mut roster: Vec<String> = coordinator
        .participants()
        .iter()
        .map(|p| p.name.clone())
        .collect();
    let mut started = Instant::now();
    let played = coordinator
        .run_with(|summary, table| {
            metrics::record_round(summary);
            metrics::active_participants(table.len());
            let seated: Vec<String> = table.iter().map(|p| p.name.clone()).collect();
            metrics::record_roster_change(&roster, &seated);
            roster = seated;

            for settlement in &summary.settlements {
                logging::log_settlement(
                    summary.round,
                    &settlement.name,
                    &settlement.outcome.to_string(),
                    settlement.bet,
                    settlement.payout,
                );
            }
            // Includes the wait for the previous continuation answer
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            logging::log_round_duration(summary.round, elapsed);
            started = Instant::now();
        })
        .await?;
    logging::log_session_event(
        "finish",
        None,
        coordinator.round(),
        &format!("session over after {played} round(s)"),
    );
    Ok(played)
}
