//! Opponent decision service.
//!
//! Both operations follow the same reliability pattern: build a context-laden
//! prompt, send it to the external collaborator, validate the returned
//! coordinate against game legality, and substitute a computed fallback on
//! any failure. The collaborator is unreliable and latent; the match must
//! never stall or crash waiting on it, so a uniformly random legal move is
//! the degraded behavior. Every call appends one complete record to the
//! decision log, whether or not the fallback fired.

use crate::game::{claimant_of, RoundHistory, Side};
use crate::grid::{enumerate_unclaimed, ClaimedSet, Coord};
use crate::llm_client::{LlmClient, LlmError, ThinkingMode};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Last-resort coordinate when no legal cell remains. Unreachable in a
/// correctly terminating match, but the service must not panic.
const SENTINEL: Coord = Coord { x: 1, y: 1 };

/// The external collaborator boundary: propose structured content for a
/// system prompt. Implemented by [`LlmClient`] in production and by
/// scripted fakes in tests.
#[async_trait::async_trait]
pub trait DecisionBackend: Send + Sync {
    /// Requests one completion. The reply is expected (but not guaranteed)
    /// to parse as `{"analyse": string, "x": int, "y": int}`.
    async fn propose(&self, system_prompt: &str, thinking: ThinkingMode)
        -> Result<String, LlmError>;
}

#[async_trait::async_trait]
impl DecisionBackend for LlmClient {
    async fn propose(
        &self,
        system_prompt: &str,
        thinking: ThinkingMode,
    ) -> Result<String, LlmError> {
        self.generate(system_prompt, thinking).await
    }
}

/// Structured content expected from the collaborator.
#[derive(Debug, Deserialize)]
struct OracleReply {
    analyse: Option<String>,
    x: i64,
    y: i64,
}

/// One observability entry per collaborator call. Records are built fully
/// before being appended and carry the match epoch they were issued for,
/// so a record can never be patched by a reply belonging to a discarded
/// match.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    /// Monotonic request id within this service.
    pub request_id: u64,
    /// Match epoch the request was issued for.
    pub epoch: u64,
    /// The outbound system prompt.
    pub prompt: String,
    /// Raw reply content, when the transport succeeded.
    pub raw: Option<String>,
    /// Error text, when transport or validation failed.
    pub error: Option<String>,
    /// The coordinate actually delivered to the match.
    pub resolved: Coord,
    /// True when the fallback policy produced `resolved`.
    pub fallback: bool,
}

/// Append-only debugging feed of collaborator calls. Growth is unbounded
/// for the lifetime of a match, which is itself bounded by a single game.
#[derive(Debug, Default)]
pub struct DecisionLog {
    entries: Vec<DecisionRecord>,
    next_id: u64,
}

impl DecisionLog {
    fn append(&mut self, mut record: DecisionRecord) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        record.request_id = id;
        self.entries.push(record);
        id
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[DecisionRecord] {
        &self.entries
    }
}

/// Produces validated coordinates for the automated side, falling back to
/// uniform random legal cells when the collaborator fails.
pub struct DecisionService {
    backend: Arc<dyn DecisionBackend>,
    thinking: ThinkingMode,
    rng: StdRng,
    log: DecisionLog,
}

impl std::fmt::Debug for DecisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionService")
            .field("thinking", &self.thinking)
            .field("log_len", &self.log.records().len())
            .finish()
    }
}

impl DecisionService {
    /// Creates a service over the given collaborator.
    #[instrument(skip(backend))]
    pub fn new(backend: Arc<dyn DecisionBackend>, thinking: ThinkingMode) -> Self {
        info!(?thinking, "Creating decision service");
        Self {
            backend,
            thinking,
            rng: StdRng::from_entropy(),
            log: DecisionLog::default(),
        }
    }

    /// Creates a service with a seeded RNG so fallback selection is
    /// reproducible.
    pub fn with_seed(backend: Arc<dyn DecisionBackend>, thinking: ThinkingMode, seed: u64) -> Self {
        Self {
            backend,
            thinking,
            rng: StdRng::seed_from_u64(seed),
            log: DecisionLog::default(),
        }
    }

    /// The debugging feed of every call made so far.
    pub fn log(&self) -> &DecisionLog {
        &self.log
    }

    /// Proposes the opponent's poison placement.
    ///
    /// The prompt carries the board size and up to 3 most-recent placement
    /// rounds. On any failure the fallback draws uniformly from the full
    /// board; nothing has been claimed yet, so no exclusion is needed.
    #[instrument(skip(self, history))]
    pub async fn propose_poison_placement(
        &mut self,
        size: u8,
        history: &RoundHistory,
        epoch: u64,
    ) -> Coord {
        let prompt = placement_prompt(size, history);
        let reply = self.backend.propose(&prompt, self.thinking).await;

        let (raw, verdict) = split_reply(reply, |content| validate_placement(content, size));
        let resolved = match verdict {
            Ok(c) => {
                info!(coord = %c, "Collaborator poison placement accepted");
                c
            }
            Err(ref reason) => {
                warn!(reason = %reason, "Poison placement fallback triggered");
                Coord::new(self.rng.gen_range(1..=size), self.rng.gen_range(1..=size))
            }
        };

        self.log.append(DecisionRecord {
            request_id: 0,
            epoch,
            prompt,
            raw,
            error: verdict.as_ref().err().cloned(),
            resolved,
            fallback: verdict.is_err(),
        });
        resolved
    }

    /// Proposes the opponent's next claim.
    ///
    /// Validation short-circuits in order: well-formed with a rationale,
    /// in bounds, not already claimed, not the opponent's own poison. On
    /// any failure the fallback picks uniformly from the unclaimed cells
    /// excluding the own poison, or the (1,1) sentinel if none remain.
    #[instrument(skip(self, claimed))]
    pub async fn propose_turn_move(
        &mut self,
        own_poison: Coord,
        claimed: &ClaimedSet,
        size: u8,
        turn_owner: Side,
        epoch: u64,
    ) -> Coord {
        let prompt = move_prompt(own_poison, claimed, size, turn_owner);
        let reply = self.backend.propose(&prompt, self.thinking).await;

        let (raw, verdict) = split_reply(reply, |content| {
            validate_move(content, size, claimed, own_poison)
        });
        let resolved = match verdict {
            Ok(c) => {
                info!(coord = %c, "Collaborator move accepted");
                c
            }
            Err(ref reason) => {
                warn!(reason = %reason, "Turn move fallback triggered");
                let free = enumerate_unclaimed(size, claimed, &[own_poison]);
                free.choose(&mut self.rng).copied().unwrap_or(SENTINEL)
            }
        };

        self.log.append(DecisionRecord {
            request_id: 0,
            epoch,
            prompt,
            raw,
            error: verdict.as_ref().err().cloned(),
            resolved,
            fallback: verdict.is_err(),
        });
        resolved
    }
}

/// Splits a backend reply into the raw text (when transport succeeded) and
/// the validation verdict.
fn split_reply<F>(
    reply: Result<String, LlmError>,
    validate: F,
) -> (Option<String>, Result<Coord, String>)
where
    F: FnOnce(&str) -> Result<Coord, String>,
{
    match reply {
        Ok(content) => {
            let verdict = validate(&content);
            (Some(content), verdict)
        }
        Err(e) => (None, Err(e.to_string())),
    }
}

fn parse_reply(content: &str) -> Result<OracleReply, String> {
    serde_json::from_str::<OracleReply>(content)
        .map_err(|e| format!("Malformed reply: {}; content: {}", e, content))
}

fn coord_in_bounds(reply: &OracleReply, size: u8) -> Result<Coord, String> {
    let range = 1..=i64::from(size);
    if !range.contains(&reply.x) || !range.contains(&reply.y) {
        return Err(format!(
            "Coordinate ({}, {}) outside 1..={}",
            reply.x, reply.y, size
        ));
    }
    Ok(Coord::new(reply.x as u8, reply.y as u8))
}

fn validate_placement(content: &str, size: u8) -> Result<Coord, String> {
    let reply = parse_reply(content)?;
    coord_in_bounds(&reply, size)
}

fn validate_move(
    content: &str,
    size: u8,
    claimed: &ClaimedSet,
    own_poison: Coord,
) -> Result<Coord, String> {
    let reply = parse_reply(content)?;
    if reply.analyse.as_deref().map_or(true, str::is_empty) {
        return Err("Reply missing rationale".to_string());
    }
    let coord = coord_in_bounds(&reply, size)?;
    if claimed.contains(coord) {
        return Err(format!("Collaborator chose already-claimed cell {}", coord));
    }
    if coord == own_poison {
        return Err("Collaborator chose its own poison cell".to_string());
    }
    Ok(coord)
}

const RULES: &str = "Rules:\n\
    1. Each side secretly places a poison cell on the n*n grid; the two \
    poisons may share a cell.\n\
    2. A dice roll decides who starts; sides then alternate, each claiming \
    a cell that has not been claimed before.\n\
    3. The side that claims a poison cell loses and the other side wins.";

fn placement_prompt(size: u8, history: &RoundHistory) -> String {
    // Stable prompt shape: absence of history is stated explicitly.
    let history_block = if history.is_empty() {
        "No history yet.".to_string()
    } else {
        history
            .entries()
            .iter()
            .take(3)
            .map(|e| {
                format!(
                    "Round {}: player ({}, {}), opponent ({}, {})",
                    e.round,
                    e.player_poison.x,
                    e.player_poison.y,
                    e.opponent_poison.x,
                    e.opponent_poison.y
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are the automated opponent in the poison game. Analyze the \
         player's past placements and choose the poison cell they are most \
         likely to step on.\n\n{rules}\n\nCurrent game: a {size}x{size} grid.\n\n\
         Past placements, newest first:\n{history}\n\n\
         Reply with JSON only, coordinates indexed from 1 to {size}: \
         {{\"analyse\": \"your reasoning\", \"x\": number, \"y\": number}}",
        rules = RULES,
        size = size,
        history = history_block,
    )
}

fn move_prompt(own_poison: Coord, claimed: &ClaimedSet, size: u8, turn_owner: Side) -> String {
    debug!(claims = claimed.len(), "Formatting claim history for prompt");
    let history = claimed
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, c)| match claimant_of(turn_owner, i) {
            Side::Player => format!("player claimed {}", c),
            Side::Opponent => format!("opponent claimed {}", c),
        })
        .collect::<Vec<_>>()
        .join("; ");
    let history = if history.is_empty() {
        "no claims yet".to_string()
    } else {
        history
    };

    format!(
        "You are the automated opponent in the poison game. Avoid the \
         player's hidden poison and steer the player toward yours.\n\n\
         {rules}\n\nCurrent game: a {size}x{size} grid; your own poison is at \
         {poison}.\nClaim history: {history}.\n\n\
         Choose a cell that: 1) has not been claimed; 2) is unlikely to be \
         the player's poison; 3) is not your own poison.\n\
         Reply with JSON only, coordinates indexed from 1 to {size}: \
         {{\"analyse\": \"your reasoning\", \"x\": number, \"y\": number}}",
        rules = RULES,
        size = size,
        poison = own_poison,
        history = history,
    )
}
