//! Blackjack table server.
//!
//! Accepts participants over TCP, waits in a lobby, then deals rounds until
//! everyone has left or the round limit is reached. With `--local` the same
//! table is played hot-seat on this terminal instead.

use anyhow::{Error, bail};
use ctrlc::set_handler;
use log::{error, info};
use pb_server::{
    config::{Overrides, ServerConfig},
    lobby, logging, metrics, runner,
};
use pico_args::Arguments;
use private_blackjack::{
    net::{network_io::NetworkIo, registry::Registry, server},
    session::{Coordinator, TerminalIo},
};
use tokio::{io::BufReader, net::TcpListener};

const HELP: &str = "\
Run a private blackjack table

USAGE:
  pb_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:5555]
  --players    N           Participants needed to start without the operator  [default: env MIN_PLAYERS or 1]
  --timeout    SECS        Seconds a participant may take to answer, 0 to wait forever  [default: env TURN_TIMEOUT_SECS or 60]
  --rounds     N           Rounds to play, 0 for unlimited  [default: env MAX_ROUNDS or 0]
  --metrics    IP:PORT     Export Prometheus metrics on this address  [default: env METRICS_BIND]
  --local      NAMES       Play hot-seat on this terminal with comma-separated NAMES

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  MAX_PLAYERS              Seats at the table (at most 7)
  STARTING_CHIPS           Chips each participant sits down with
  ZERO_CHIP_STIPEND        Chips granted to anyone who runs dry
  (See .env file for all configuration options)

While the lobby is open, type 'start' to deal with whoever has joined.
";

struct Args {
    overrides: Overrides,
    local: Option<Vec<String>>,
}

fn parse_names(raw: &str) -> Result<Vec<String>, String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(server::sanitize_name) {
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    if names.is_empty() {
        return Err("expected at least one name".to_string());
    }
    Ok(names)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        overrides: Overrides {
            bind: pargs.opt_value_from_str("--bind")?,
            min_players: pargs.opt_value_from_str("--players")?,
            turn_timeout_secs: pargs.opt_value_from_str("--timeout")?,
            max_rounds: pargs.opt_value_from_str("--rounds")?,
            metrics_bind: pargs.opt_value_from_str("--metrics")?,
        },
        local: pargs.opt_value_from_fn("--local", parse_names)?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = ServerConfig::from_env(args.overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Exporting metrics at http://{addr}/metrics");
    }

    if let Some(names) = args.local {
        info!("Playing hot-seat with {}", names.join(", "));
        let mut coordinator = Coordinator::new(TerminalIo::stdio(names), config.session);
        let played = runner::play_session(&mut coordinator).await?;
        info!("Played {played} round(s)");
        return Ok(());
    }

    let registry = Registry::new(config.session.max_players);
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;
    info!(
        "Blackjack table is open at {}. Press Ctrl+C to stop.",
        listener.local_addr()?
    );

    let acceptor = {
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = server::serve(listener, registry).await {
                error!("Acceptor stopped: {e}");
            }
        })
    };

    let roster = lobby::wait_for_start(
        &registry,
        config.session.min_players,
        BufReader::new(tokio::io::stdin()),
    )
    .await;
    info!("Dealing for {}", roster.join(", "));
    lobby::announce_start(&registry);

    let io = NetworkIo::new(registry, config.session.turn_timeout);
    let mut coordinator = Coordinator::new(io, config.session);
    let result = runner::play_session(&mut coordinator).await;
    acceptor.abort();

    let code = match result {
        Ok(played) => {
            info!("Played {played} round(s), shutting down");
            0
        }
        Err(e) => {
            error!("Session ended: {e}");
            1
        }
    };

    // A console read left over from the lobby would keep the runtime alive.
    std::process::exit(code);
}
