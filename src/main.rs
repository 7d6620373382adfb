//! Poison Game - terminal front end.

use anyhow::Result;
use clap::Parser;
use poison_game::{
    ClaimOutcome, Coord, DecisionBackend, DecisionService, GameConfig, LlmClient, LlmError,
    MatchEngine, MatchRunner, Phase, RollOutcome, Side, ThinkingMode,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            board_size,
            seed,
            offline,
        } => play(config, board_size, seed, offline).await,
    }
}

/// A backend that always fails, so every opponent decision resolves
/// through the fallback policy. Used when no credential is available.
#[derive(Debug)]
struct OfflineBackend;

#[async_trait::async_trait]
impl DecisionBackend for OfflineBackend {
    async fn propose(
        &self,
        _system_prompt: &str,
        _thinking: ThinkingMode,
    ) -> Result<String, LlmError> {
        Err(LlmError::new("offline mode, no collaborator".to_string()))
    }
}

#[instrument(skip_all, fields(config_path = %config_path.display()))]
async fn play(
    config_path: std::path::PathBuf,
    board_size: Option<u8>,
    seed: Option<u64>,
    offline: bool,
) -> Result<()> {
    let mut config = if config_path.exists() {
        GameConfig::from_file(&config_path)?
    } else {
        info!("Config file not found, using defaults");
        GameConfig::default()
    };
    if let Some(size) = board_size {
        config = config.with_board_size(size)?;
    }

    // Credential check happens here, before the match leaves setup.
    let backend: Arc<dyn DecisionBackend> = if offline {
        Arc::new(OfflineBackend)
    } else {
        Arc::new(LlmClient::new(config.create_llm_config()?))
    };

    let service = match seed {
        Some(seed) => DecisionService::with_seed(backend, *config.thinking_mode(), seed),
        None => DecisionService::new(backend, *config.thinking_mode()),
    };
    let engine = MatchEngine::new(*config.board_size())?;
    let mut runner = match seed {
        Some(seed) => MatchRunner::with_seed(engine, service, seed),
        None => MatchRunner::new(engine, service),
    };

    println!("Poison game on a {0}x{0} grid.", runner.engine().board_size());
    println!("Commands: start | roll | <x> <y> | reveal | log | restart | quit");

    let stdin = std::io::stdin();
    loop {
        prompt(&runner)?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match line.trim() {
            "" => continue,
            "quit" | "q" => break,
            "start" => match runner.start_game() {
                Ok(()) => println!("Place your poison: enter coordinates as `x y`."),
                Err(e) => println!("Cannot start: {}", e),
            },
            "roll" => match runner.draw().await {
                Ok(RollOutcome::Tie(roll)) => {
                    println!(
                        "Tie: you rolled {}, opponent rolled {}. Roll again.",
                        roll.player, roll.opponent
                    );
                }
                Ok(RollOutcome::Decided { roll, starter }) => {
                    println!(
                        "You rolled {}, opponent rolled {}. {} starts.",
                        roll.player,
                        roll.opponent,
                        match starter {
                            Side::Player => "You",
                            Side::Opponent => "The opponent",
                        }
                    );
                    report_board(&runner);
                    // The opening move can itself hit a poison.
                    if runner.engine().phase() == Phase::Ended {
                        println!("The opponent claimed a poison cell. You win!");
                        report_poisons(&runner);
                    }
                }
                Err(e) => println!("Cannot roll: {}", e),
            },
            "restart" => {
                runner.engine_mut().restart();
                println!("Match discarded. Enter `start` to begin a new one.");
            }
            "reveal" => {
                runner.engine_mut().toggle_reveal();
                report_poisons(&runner);
            }
            "log" => {
                for record in runner.decision_log().records() {
                    println!(
                        "#{} epoch {} -> {} (fallback: {}){}",
                        record.request_id,
                        record.epoch,
                        record.resolved,
                        record.fallback,
                        record
                            .error
                            .as_deref()
                            .map(|e| format!(" error: {}", e))
                            .unwrap_or_default(),
                    );
                }
            }
            text => match parse_coord(text) {
                Some(c) => handle_coord(&mut runner, c).await?,
                None => println!("Unrecognized command: {}", text),
            },
        }
    }

    Ok(())
}

fn parse_coord(text: &str) -> Option<Coord> {
    let mut parts = text.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Coord::new(x, y))
}

async fn handle_coord(runner: &mut MatchRunner, c: Coord) -> Result<()> {
    match runner.engine().phase() {
        Phase::PlacingPoison => match runner.place_poison(c).await {
            Ok(()) => println!("Poisons placed. Enter `roll` to decide who starts."),
            Err(e) => println!("Cannot place poison: {}", e),
        },
        Phase::Playing => match runner.claim(c).await {
            ClaimOutcome::Rejected(reason) => println!("Claim refused: {:?}", reason),
            ClaimOutcome::Continued | ClaimOutcome::AwaitingOpponent(_) => report_board(runner),
            ClaimOutcome::Ended { winner } => {
                match winner {
                    Side::Player => println!("The opponent claimed a poison cell. You win!"),
                    Side::Opponent => println!("You claimed a poison cell. You lose."),
                }
                report_poisons(runner);
                println!("Enter `restart` to play again.");
            }
            ClaimOutcome::Stale => {}
        },
        phase => println!("No coordinate expected during {}.", phase),
    }
    Ok(())
}

fn report_board(runner: &MatchRunner) {
    let engine = runner.engine();
    let claims = engine
        .claimed()
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, c)| match engine.claimant(i) {
            Some(Side::Player) => format!("you {}", c),
            _ => format!("opp {}", c),
        })
        .collect::<Vec<_>>()
        .join(", ");
    println!("Claims so far: [{}]", claims);
    if engine.active_side() == Some(Side::Player) {
        println!("Your turn.");
    }
}

fn report_poisons(runner: &MatchRunner) {
    match runner.engine().revealed_poisons() {
        Some((player, opponent)) => {
            println!("Your poison: {}; opponent poison: {}", player, opponent)
        }
        None => println!("Poisons are hidden."),
    }
}

fn prompt(runner: &MatchRunner) -> Result<()> {
    print!("[{}]> ", runner.engine().phase());
    std::io::stdout().flush()?;
    Ok(())
}
