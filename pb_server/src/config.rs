//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use private_blackjack::SessionConfig;
use std::{net::SocketAddr, time::Duration};

/// Default acceptor address.
pub const DEFAULT_BIND: &str = "127.0.0.1:5555";

/// Default bound on a participant's answer, in seconds.
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 60;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address, if metrics are exported
    pub metrics_bind: Option<SocketAddr>,
    /// Table rules handed to the coordinator
    pub session: SessionConfig,
}

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub min_players: Option<usize>,
    pub turn_timeout_secs: Option<u64>,
    pub max_rounds: Option<u32>,
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but can't be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(overrides: Overrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.map_or_else(default_bind, Ok)?,
        };

        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => parse_var(&lookup, "METRICS_BIND")?,
        };

        let defaults = SessionConfig::default();
        let turn_timeout_secs = match overrides.turn_timeout_secs {
            Some(secs) => secs,
            None => parse_or(&lookup, "TURN_TIMEOUT_SECS", DEFAULT_TURN_TIMEOUT_SECS)?,
        };
        let min_players = match overrides.min_players {
            Some(count) => count,
            None => parse_or(&lookup, "MIN_PLAYERS", defaults.min_players)?,
        };
        let max_rounds = match overrides.max_rounds {
            Some(rounds) => rounds,
            None => parse_or(&lookup, "MAX_ROUNDS", defaults.max_rounds)?,
        };

        let session = SessionConfig {
            starting_chips: parse_or(&lookup, "STARTING_CHIPS", defaults.starting_chips)?,
            stipend: parse_or(&lookup, "ZERO_CHIP_STIPEND", defaults.stipend)?,
            max_players: parse_or(&lookup, "MAX_PLAYERS", defaults.max_players)?,
            min_players,
            // 0 waits forever
            turn_timeout: (turn_timeout_secs > 0).then(|| Duration::from_secs(turn_timeout_secs)),
            max_rounds,
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            session,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session
            .validate()
            .map_err(|reason| ConfigError::Invalid {
                var: "session".to_string(),
                reason,
            })?;

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from the server address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> Result<SocketAddr, ConfigError> {
    DEFAULT_BIND.parse().map_err(|_| ConfigError::MissingRequired {
        var: "SERVER_BIND".to_string(),
        hint: "Pass --bind IP:PORT".to_string(),
    })
}

/// Parse `key` if it's set, failing loudly on garbage
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: format!("Can't parse '{raw}'"),
                })
        }
        _ => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_var(lookup, key)?.unwrap_or(default))
}
