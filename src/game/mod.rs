//! Match state machine and domain types.

mod engine;
mod types;

pub use engine::{
    ClaimOutcome, ClaimRejection, DecisionTicket, MatchEngine, MatchError, MatchRunner,
};
pub use types::{claimant_of, Phase, RoundEntry, RoundHistory, Side, ROUND_HISTORY_LIMIT};
