use private_blackjack::{Action, net::messages::Message};
use std::fmt;

/// Errors that can occur during input parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing was typed.
    Empty,
    /// Bet amount isn't a whole number.
    InvalidBetAmount(String),
    /// Not one of hit, stand or double.
    UnrecognizedAction(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Type something, or 'quit' to leave"),
            Self::InvalidBetAmount(value) => write!(
                f,
                "Invalid bet '{}'. Must be a whole number of chips (e.g., '50')",
                value
            ),
            Self::UnrecognizedAction(value) => write!(
                f,
                "Unrecognized action '{}'. Choose hit, stand or double (or h, s, d)",
                value
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// What a line of input asks the client to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Answer the outstanding request.
    Reply(Message),
    /// Leave the table.
    Quit,
}

fn is_quit(input: &str) -> bool {
    matches!(input, "quit" | "exit")
}

/// Parse an answer to a `bet_request`.
///
/// Range checks are left to the server, which re-prompts on a bad amount.
///
/// # Examples
///
/// ```
/// use pb_client::commands::{Command, parse_bet};
/// use private_blackjack::net::messages::Message;
///
/// assert_eq!(parse_bet(" 50 "), Ok(Command::Reply(Message::BetResponse { amount: 50 })));
/// assert_eq!(parse_bet("quit"), Ok(Command::Quit));
/// assert!(parse_bet("fifty").is_err());
/// ```
pub fn parse_bet(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if is_quit(trimmed) {
        return Ok(Command::Quit);
    }
    let amount = trimmed
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidBetAmount(trimmed.to_string()))?;
    Ok(Command::Reply(Message::BetResponse { amount }))
}

/// Parse an answer to an `action_request`.
///
/// # Examples
///
/// ```
/// use pb_client::commands::{Command, parse_action};
/// use private_blackjack::net::messages::Message;
///
/// assert_eq!(
///     parse_action("H"),
///     Ok(Command::Reply(Message::ActionResponse { action: "hit".to_string() }))
/// );
/// ```
pub fn parse_action(input: &str) -> Result<Command, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if is_quit(trimmed) {
        return Ok(Command::Quit);
    }
    let action: Action = trimmed
        .parse()
        .map_err(|_| ParseError::UnrecognizedAction(trimmed.to_string()))?;
    Ok(Command::Reply(Message::ActionResponse {
        action: action.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str) -> Command {
        Command::Reply(Message::ActionResponse {
            action: name.to_string(),
        })
    }

    #[test]
    fn test_parse_bet() {
        assert_eq!(
            parse_bet("100\n"),
            Ok(Command::Reply(Message::BetResponse { amount: 100 }))
        );
    }

    #[test]
    fn test_parse_bet_keeps_negative_for_the_server() {
        assert_eq!(
            parse_bet("-5"),
            Ok(Command::Reply(Message::BetResponse { amount: -5 }))
        );
    }

    #[test]
    fn test_parse_bet_rejects_text() {
        assert_eq!(
            parse_bet("lots"),
            Err(ParseError::InvalidBetAmount("lots".to_string()))
        );
        assert_eq!(parse_bet("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_parse_action_full_and_short() {
        assert_eq!(parse_action("hit"), Ok(action("hit")));
        assert_eq!(parse_action("s"), Ok(action("stand")));
        assert_eq!(parse_action(" Double "), Ok(action("double")));
    }

    #[test]
    fn test_parse_action_rejects_unknown() {
        let err = parse_action("split").unwrap_err();
        assert_eq!(err, ParseError::UnrecognizedAction("split".to_string()));
        assert!(err.to_string().contains("hit, stand or double"));
    }

    #[test]
    fn test_quit_works_for_both_prompts() {
        assert_eq!(parse_action("exit"), Ok(Command::Quit));
        assert_eq!(parse_bet("quit"), Ok(Command::Quit));
    }
}
