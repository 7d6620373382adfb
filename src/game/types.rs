//! Core domain types for the poison game.

use crate::grid::Coord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of placement rounds retained as prompt context.
pub const ROUND_HISTORY_LIMIT: usize = 5;

/// A side in the match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The human player.
    Player,
    /// The LLM-driven opponent.
    Opponent,
}

impl Side {
    /// Returns the other side.
    pub fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }
}

/// Which side made the claim at `index` of the claim sequence, given who
/// started the match.
///
/// This is the single parity derivation shared by the match engine and the
/// decision service; the attribution is never stored separately.
pub fn claimant_of(turn_owner: Side, index: usize) -> Side {
    if index % 2 == 0 {
        turn_owner
    } else {
        turn_owner.opponent()
    }
}

/// Phase of a match. Transitions are one-directional except the explicit
/// restart, which discards the match and begins a fresh one in `Setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Board size and credentials may still change.
    Setup,
    /// Waiting for both poisons to be placed.
    PlacingPoison,
    /// Rolling dice for the starting side; stays here on a tie.
    TurnOrderDraw,
    /// Sides alternate claims.
    Playing,
    /// Terminal; the winner is set and poisons are disclosable.
    Ended,
}

/// One completed placement round, kept as contextual input for the
/// opponent's next poison placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEntry {
    /// Round counter, starting at 1.
    pub round: u32,
    /// Where the human hid their poison that round.
    pub player_poison: Coord,
    /// Where the opponent hid its poison that round.
    pub opponent_poison: Coord,
    /// When the round's placement completed.
    pub timestamp: DateTime<Utc>,
}

/// Bounded most-recent-first history of placement rounds.
///
/// Holds at most [`ROUND_HISTORY_LIMIT`] entries; inserting drops the
/// oldest. Used only to bias the opponent's poison placement, never for
/// gameplay logic.
#[derive(Debug, Clone, Default)]
pub struct RoundHistory {
    entries: Vec<RoundEntry>,
}

impl RoundHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry at the front, dropping the oldest past the limit.
    pub fn record(&mut self, entry: RoundEntry) {
        debug!(round = entry.round, "Recording placement round");
        self.entries.insert(0, entry);
        self.entries.truncate(ROUND_HISTORY_LIMIT);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[RoundEntry] {
        &self.entries
    }

    /// Number of retained rounds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True iff no round has completed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
