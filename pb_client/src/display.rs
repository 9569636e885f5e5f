//! Turning server frames into terminal text.

use private_blackjack::{GameView, net::messages::Message};

/// Render a table snapshot, marking whose turn it is and which row is ours.
pub fn render_view(view: &GameView, me: &str) -> String {
    let mut out = format!("=== Round {} | {} ===\n", view.round, view.phase);
    out.push_str(&format!("  Dealer      {}\n", view.dealer.hand));
    for player in &view.players {
        let turn = if view.current_player.as_deref() == Some(player.name.as_str()) {
            '>'
        } else {
            ' '
        };
        let you = if player.name == me { " (you)" } else { "" };
        out.push_str(&format!(
            "{turn} {}{you}: {} chips, bet {}",
            player.name, player.chips, player.current_bet
        ));
        if !player.hand.is_empty() {
            out.push_str(&format!(", hand {}", player.hand));
        }
        out.push('\n');
    }
    out
}

/// Text to print for a frame, or `None` for frames the input loop handles.
pub fn render(message: &Message, me: &str) -> Option<String> {
    match message {
        Message::JoinAck { players } => Some(format!("At the table: {}", players.join(", "))),
        Message::Start => Some("The first round is starting.".to_string()),
        Message::State(view) => Some(render_view(view, me)),
        Message::Info { message } => Some(message.clone()),
        Message::Error { message } => Some(format!("Error: {message}")),
        Message::BetRequest
        | Message::ActionRequest { .. }
        | Message::Join { .. }
        | Message::BetResponse { .. }
        | Message::ActionResponse { .. } => None,
    }
}

/// Prompt for a bet given our balance in the latest snapshot.
pub fn bet_prompt(chips: Option<u32>) -> String {
    match chips {
        Some(chips) => format!("Place your bet (1-{chips}): "),
        None => "Place your bet: ".to_string(),
    }
}
