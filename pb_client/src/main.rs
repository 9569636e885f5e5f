//! A terminal client for a private blackjack table.
//!
//! The client joins a server, prints every announcement and table snapshot,
//! and answers bet and action requests from stdin.

use anyhow::{Error, bail};
use ctrlc::set_handler;
use log::{debug, info};
use pb_client::{
    commands::{self, Command, ParseError},
    display,
};
use pico_args::Arguments;
use private_blackjack::net::{client::Client, messages::Message};
use std::net::SocketAddr;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

const HELP: &str = "\
Join a private blackjack table

USAGE:
  pb_client [OPTIONS]

OPTIONS:
  --server     IP:PORT     Server socket address  [default: 127.0.0.1:5555]
  --name       NAME        Name at the table  [default: $USER]

FLAGS:
  -h, --help               Print help information

Answer actions with hit, stand or double (h, s, d). Type quit to leave.
";

struct Args {
    server: SocketAddr,
    name: String,
}

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        server: pargs
            .opt_value_from_str("--server")?
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 5555))),
        name: pargs
            .opt_value_from_str("--name")?
            .unwrap_or_else(whoami::username),
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    info!("Joining {} as {}", args.server, args.name);
    let mut client = Client::connect(&args.name, &args.server).await?;
    println!("Seated as {}.", client.name);
    println!("At the table: {}", client.players.join(", "));

    let mut input = BufReader::new(io::stdin()).lines();
    play(&mut client, &mut input).await?;

    println!("Left the table.");
    Ok(())
}

async fn play(client: &mut Client, input: &mut Input) -> Result<(), Error> {
    let mut chips = None;
    while let Some(message) = client.next().await? {
        debug!("received {}", message.kind());
        if let Message::State(view) = &message {
            chips = view
                .players
                .iter()
                .find(|p| p.name == client.name)
                .map(|p| p.chips);
        }
        if let Some(text) = display::render(&message, &client.name) {
            println!("{text}");
        }

        let reply = match &message {
            Message::BetRequest => {
                ask(input, &display::bet_prompt(chips), commands::parse_bet).await?
            }
            Message::ActionRequest { prompt } => {
                ask(input, &format!("{prompt} "), commands::parse_action).await?
            }
            _ => continue,
        };
        match reply {
            Command::Reply(reply) => client.send(&reply).await?,
            Command::Quit => return Ok(()),
        }
    }
    println!("The server closed the table.");
    Ok(())
}

/// Prompt until a line parses. End of input counts as quitting.
async fn ask(
    input: &mut Input,
    prompt: &str,
    parse: fn(&str) -> Result<Command, ParseError>,
) -> Result<Command, Error> {
    let mut stdout = io::stdout();
    loop {
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = input.next_line().await? else {
            return Ok(Command::Quit);
        };
        match parse(&line) {
            Ok(command) => return Ok(command),
            Err(ParseError::Empty) => continue,
            Err(e) => println!("{e}"),
        }
    }
}
