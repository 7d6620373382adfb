//! Command-line interface for the poison game.

use clap::{Parser, Subcommand};

/// Poison Game - grid deduction against an LLM-driven opponent
#[derive(Parser, Debug)]
#[command(name = "poison_game")]
#[command(about = "Play the poison game against an LLM opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play an interactive match in the terminal
    Play {
        /// Path to the game configuration file
        #[arg(short, long, default_value = "poison_game.toml")]
        config: std::path::PathBuf,

        /// Override the board edge (3-10)
        #[arg(short, long)]
        board_size: Option<u8>,

        /// Seed for dice and fallback randomness (reproducible matches)
        #[arg(long)]
        seed: Option<u64>,

        /// Run without a model credential; the opponent plays entirely on
        /// the fallback policy
        #[arg(long)]
        offline: bool,
    },
}
