//! Turn resolver: a repeated fair dice draw decides which side starts.

use crate::game::Side;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One pair of dice rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// The human player's roll, 1..=6.
    pub player: u8,
    /// The opponent's roll, 1..=6.
    pub opponent: u8,
}

/// Result of a starting-side draw.
///
/// A tie is an explicit redraw signal, not an error: the caller must
/// re-invoke the resolver and must not begin play on a tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    /// Rolls differ; the higher roll's side starts.
    Decided {
        /// The decisive roll pair.
        roll: DiceRoll,
        /// The side that starts.
        starter: Side,
    },
    /// Rolls are equal; draw again.
    Tie(DiceRoll),
}

/// Draws one die per side, uniformly from 1..=6, and resolves the starter.
/// No state is mutated beyond the caller's RNG.
pub fn decide_starting_side<R: Rng>(rng: &mut R) -> RollOutcome {
    let roll = DiceRoll {
        player: rng.gen_range(1..=6),
        opponent: rng.gen_range(1..=6),
    };
    debug!(player = roll.player, opponent = roll.opponent, "Dice rolled");

    match roll.player.cmp(&roll.opponent) {
        std::cmp::Ordering::Greater => {
            info!(starter = %Side::Player, "Starting side decided");
            RollOutcome::Decided {
                roll,
                starter: Side::Player,
            }
        }
        std::cmp::Ordering::Less => {
            info!(starter = %Side::Opponent, "Starting side decided");
            RollOutcome::Decided {
                roll,
                starter: Side::Opponent,
            }
        }
        std::cmp::Ordering::Equal => {
            debug!("Dice tied, redraw required");
            RollOutcome::Tie(roll)
        }
    }
}
