// SPDX-License-Identifier: MIT OR Apache-2.0

//! goroom CLI - play Go in the terminal
//!
//! Runs a match registry in-process and drives a Hotseat or AI match from
//! stdin. Matches are restored from the store on start and written back on
//! exit.

mod render;

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use goroom_core::Color;
use goroom_server::config::{load_config, load_config_from};
use goroom_server::{
    Connection, HttpAiClient, Identity, JsonFileStore, MatchRegistry, MemoryStore, Persistence,
    ServerEvent, SessionType, UserRecord,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Who the second seat is
    #[arg(short, long, value_enum, default_value = "hotseat")]
    mode: Mode,

    /// Board size (9, 13 or 19); 0 uses the configured default
    #[arg(short, long, default_value = "0")]
    size: u8,

    /// Your color in an AI match
    #[arg(short, long, value_enum, default_value = "black")]
    color: Side,

    /// Player name, also used as the user id
    #[arg(short, long, default_value = "player")]
    name: String,

    /// Config file instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for stored matches; overrides the config
    #[arg(long)]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Both colors on this terminal
    Hotseat,
    /// Against the configured AI service
    Ai,
}

impl From<Mode> for SessionType {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Hotseat => SessionType::Hotseat,
            Mode::Ai => SessionType::Ai,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Side {
    Black,
    White,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::Black => Color::Black,
            Side::White => Color::White,
        }
    }
}

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Place { x: i32, y: i32 },
    Pass,
    Replay(String),
    Step(i64),
    Leave,
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if args.store.is_some() {
        config.store_dir = args.store.clone();
    }

    let store: Arc<dyn Persistence> = match &config.store_dir {
        Some(dir) => Arc::new(JsonFileStore::open(dir).await?),
        None => Arc::new(MemoryStore::new()),
    };
    let ai = Arc::new(HttpAiClient::new(&config.ai)?);
    let registry = MatchRegistry::new(config, ai, store.clone());
    registry.restore(store.load_all_matches().await?).await;

    let user_id = args.name.clone();
    let (connection, mut events) = Connection::open();
    registry
        .connect(Identity::new(user_id.clone(), args.name.clone()), connection)
        .await;

    if registry.sessions().active_match(&user_id).await.is_some() {
        println!("Resuming your unfinished match");
    } else if let Err(e) = registry
        .create_match(&user_id, args.mode.into(), args.size, args.color.into())
        .await
    {
        return Err(anyhow!("Could not create a match: {e}"));
    }

    let finished = run_loop(&registry, &user_id, &mut events).await?;

    registry.shutdown().await?;
    record_games(store.as_ref(), &user_id, &args.name, finished).await?;
    info!(finished, "Session ended");
    Ok(())
}

/// Read commands and print events until quit, EOF or Ctrl+C. Returns the
/// number of matches that ended during the session.
async fn run_loop(
    registry: &MatchRegistry,
    user_id: &str,
    events: &mut tokio::sync::mpsc::UnboundedReceiver<ServerEvent>,
) -> Result<u32> {
    let mut stdin_lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut finished = 0;
    let mut board_size = registry.config().default_board_size;

    print_help();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nReceived Ctrl+C, shutting down gracefully...");
                break;
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                if let ServerEvent::MatchCreated { data } | ServerEvent::MatchJoined { data, .. } = &event {
                    board_size = data.board_size;
                }
                if matches!(event, ServerEvent::MatchOver { .. }) {
                    finished += 1;
                }
                print_event(&event);
            }

            result = stdin_lines.next_line() => {
                let line = match result {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("Error reading input: {}", e);
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let input = match parse_input(&line, board_size) {
                    Ok(input) => input,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                // Rejections come back as events
                let _ = match input {
                    Input::Place { x, y } => registry.play_move(user_id, x, y, false).await,
                    Input::Pass => registry.play_move(user_id, 0, 0, true).await,
                    Input::Replay(id) => registry.request_replay(user_id, &id).await,
                    Input::Step(index) => registry.replay_move(user_id, index).await,
                    Input::Leave => registry.leave_match(user_id).await,
                    Input::Quit => break,
                };
            }
        }
    }

    // Pick up anything the last command produced
    while let Ok(event) = events.try_recv() {
        if matches!(event, ServerEvent::MatchOver { .. }) {
            finished += 1;
        }
        print_event(&event);
    }

    Ok(finished)
}

async fn record_games(store: &dyn Persistence, user_id: &str, name: &str, finished: u32) -> Result<()> {
    let mut user = store.load_user(user_id).await?.unwrap_or_else(|| UserRecord {
        id: user_id.to_string(),
        display_name: name.to_string(),
        games_played: 0,
    });
    user.games_played += finished;
    store.save_user(&user).await?;
    println!("{} has finished {} games", user.display_name, user.games_played);
    Ok(())
}

/// Parse a line such as `D4`, `3 4`, `pass`, `replay 1a2b3c4d`, `step 5`
fn parse_input(line: &str, board_size: u8) -> Result<Input> {
    let lower = line.trim().to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    match words.as_slice() {
        ["pass"] => Ok(Input::Pass),
        ["leave"] => Ok(Input::Leave),
        ["quit"] | ["exit"] => Ok(Input::Quit),
        ["replay", id] => Ok(Input::Replay(id.to_string())),
        ["step", index] => index
            .parse()
            .map(Input::Step)
            .map_err(|_| anyhow!("Replay step must be a number")),
        [x, y] => match (x.parse(), y.parse()) {
            (Ok(x), Ok(y)) => Ok(Input::Place { x, y }),
            _ => Err(anyhow!("Coordinates must be numbers, e.g. '3 4'")),
        },
        [point] => parse_point(point, board_size),
        _ => Err(anyhow!(
            "Unknown command. Examples: 'D4', '3 4', 'pass', 'replay ID', 'step N', 'leave', 'quit'."
        )),
    }
}

/// Column letter plus row number, both as printed on the board
fn parse_point(point: &str, board_size: u8) -> Result<Input> {
    let mut chars = point.chars();
    let col = chars
        .next()
        .and_then(render::column_char_to_coord)
        .ok_or_else(|| anyhow!("Invalid column. Must be A-T (excluding I)."))?;
    let row = match chars.as_str().parse::<u8>() {
        Ok(r) if r < board_size => r,
        _ => return Err(anyhow!("Invalid row. Must be between 0 and {}.", board_size.saturating_sub(1))),
    };
    Ok(Input::Place {
        x: i32::from(col),
        y: i32::from(row),
    })
}

fn print_help() {
    println!("Enter a point ('D4' or '3 4'), 'pass', 'replay ID', 'step N', 'leave' or 'quit'.");
}

fn print_event(event: &ServerEvent) {
    match event {
        ServerEvent::MatchCreated { data } => {
            println!(
                "Created {:?} match {} on {}x{}; you play {}",
                data.session_type,
                data.replay_id(),
                data.board_size,
                data.board_size,
                data.player_one.color
            );
        }
        ServerEvent::MatchJoined { data, you, .. } => {
            println!("Joined match {}; you play {}", data.replay_id(), you.color);
        }
        ServerEvent::PlayerJoined { opponent } => {
            println!("{} joined as {}", opponent.display_name, opponent.color);
        }
        ServerEvent::BoardUpdated {
            board,
            color,
            pass,
            captured,
        } => {
            if *pass {
                println!("\n{} passed", color);
            } else if *captured > 0 {
                println!("\n{} captured {}", color, captured);
            } else {
                println!("\n{} played", color);
            }
            println!("{}", render::render_board(board));
            println!("{} to move", color.opposite());
        }
        ServerEvent::MatchOver { message } => println!("{}", message),
        ServerEvent::JoinFailed { reason } | ServerEvent::ReplayFailed { reason } => {
            eprintln!("{}", reason)
        }
        ServerEvent::ReplayData { data } => {
            println!(
                "Replay of {} loaded: {} moves. Use 'step N' to browse.",
                data.replay_id(),
                data.history.len()
            );
        }
        ServerEvent::ReplayState {
            board,
            index,
            is_over,
            black_score,
            white_score,
        } => {
            println!("\nMove {}", index);
            println!("{}", render::render_board(board));
            if *is_over {
                println!("Final score  Black: {}  White: {}", black_score, white_score);
            }
        }
        ServerEvent::ErrorNotice { text } => eprintln!("{}", text),
    }
}
