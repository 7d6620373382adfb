//! Poison Game - a two-player positional deduction game on an n×n grid.
//!
//! Each side secretly places a poison cell, a dice roll decides turn order,
//! and the sides alternately claim unclaimed cells until someone claims a
//! poison cell and loses. One side is human; the other is driven by an
//! external language-model service whose proposals are validated and, on
//! any failure, replaced by a uniform random legal move.
//!
//! # Architecture
//!
//! - **Grid**: coordinates, the duplicate-free claim sequence, unclaimed
//!   enumeration
//! - **Dice**: the repeated fair draw that fixes the starting side
//! - **Decision**: prompt construction, reply validation, fallback policy,
//!   and the observability log for the LLM collaborator
//! - **Game**: the phase state machine owning all canonical match state,
//!   and the runner that drives collaborator calls
//!
//! # Example
//!
//! ```no_run
//! use poison_game::{DecisionService, MatchEngine, MatchRunner};
//! use poison_game::{Coord, GameConfig, LlmClient, ThinkingMode};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GameConfig::default();
//! let client = LlmClient::new(config.create_llm_config()?);
//! let service = DecisionService::new(Arc::new(client), *config.thinking_mode());
//! let engine = MatchEngine::new(*config.board_size())?;
//! let mut runner = MatchRunner::new(engine, service);
//!
//! runner.start_game()?;
//! runner.place_poison(Coord::new(3, 3)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod decision;
mod dice;
mod game;
mod grid;
mod llm_client;

// Crate-level exports - Configuration
pub use config::{ConfigError, GameConfig};

// Crate-level exports - Decision service
pub use decision::{DecisionBackend, DecisionLog, DecisionRecord, DecisionService};

// Crate-level exports - Dice
pub use dice::{decide_starting_side, DiceRoll, RollOutcome};

// Crate-level exports - Match state machine
pub use game::{
    claimant_of, ClaimOutcome, ClaimRejection, DecisionTicket, MatchEngine, MatchError,
    MatchRunner, Phase, RoundEntry, RoundHistory, Side, ROUND_HISTORY_LIMIT,
};

// Crate-level exports - Grid model
pub use grid::{enumerate_unclaimed, ClaimedSet, Coord, MAX_BOARD_SIZE, MIN_BOARD_SIZE};

// Crate-level exports - LLM client
pub use llm_client::{LlmClient, LlmConfig, LlmError, LlmProvider, ThinkingMode};
