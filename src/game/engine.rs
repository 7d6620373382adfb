//! Match state machine and the runner that drives collaborator calls.
//!
//! All canonical state lives in [`MatchEngine`] and mutates only through
//! its transition methods. The opponent decision call is the single
//! suspension point; while one is outstanding the engine is in a waiting
//! sub-state and refuses further claims. Tickets carry the match epoch so
//! a reply that arrives after a restart is discarded instead of applied to
//! the new match.

use crate::decision::{DecisionLog, DecisionService};
use crate::dice::{decide_starting_side, DiceRoll, RollOutcome};
use crate::game::types::{claimant_of, Phase, RoundEntry, RoundHistory, Side};
use crate::grid::{ClaimedSet, Coord, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use derive_more::{Display, Error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument, warn};

/// Errors from match transition methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MatchError {
    /// Board size outside the supported range.
    #[display("board size {} outside {}..={}", size, MIN_BOARD_SIZE, MAX_BOARD_SIZE)]
    InvalidBoardSize {
        /// The rejected size.
        size: u8,
    },
    /// The transition is not legal in the current phase.
    #[display("transition not allowed in phase {}", phase)]
    WrongPhase {
        /// The phase the match was in.
        phase: Phase,
    },
    /// The human poison was already placed this match.
    #[display("poison already placed")]
    PoisonAlreadyPlaced,
    /// Coordinate outside the board.
    #[display("coordinate {} out of bounds", coord)]
    OutOfBounds {
        /// The rejected coordinate.
        coord: Coord,
    },
    /// The ticket belongs to a match that was since restarted.
    #[display("stale decision ticket")]
    StaleTicket,
    /// An opponent decision is not currently expected.
    #[display("no opponent decision outstanding")]
    NotAwaitingOpponent,
}

/// Proof that an opponent decision was requested from a specific match
/// generation. Applying a result requires presenting the ticket back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionTicket {
    epoch: u64,
}

impl DecisionTicket {
    /// The match epoch this ticket was issued for.
    pub fn epoch(self) -> u64 {
        self.epoch
    }
}

/// Why a claim was rejected. Rejections are no-ops, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    /// The match is not in the playing phase.
    NotPlaying,
    /// An opponent decision is outstanding.
    AwaitingOpponent,
    /// It is not the claiming side's turn.
    NotYourTurn,
    /// The coordinate is outside the board.
    OutOfBounds,
    /// The cell was already claimed.
    AlreadyClaimed,
}

/// Result of a claim transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim was refused; no state changed.
    Rejected(ClaimRejection),
    /// The claim was applied and play continues with the human.
    Continued,
    /// The claim was applied; an opponent decision is now required.
    AwaitingOpponent(DecisionTicket),
    /// The claim hit a poison cell and the match ended.
    Ended {
        /// The side that won (the claimant lost).
        winner: Side,
    },
    /// The ticket was stale; the result was discarded.
    Stale,
}

/// The aggregate root: one match, its phase, and every invariant-bearing
/// field. Poisons are set exactly once per match and never revealed except
/// through the gated accessor.
#[derive(Debug)]
pub struct MatchEngine {
    board_size: u8,
    phase: Phase,
    player_poison: Option<Coord>,
    opponent_poison: Option<Coord>,
    claimed: ClaimedSet,
    turn_owner: Option<Side>,
    active_side: Option<Side>,
    winner: Option<Side>,
    dice: Option<DiceRoll>,
    round_history: RoundHistory,
    round: u32,
    epoch: u64,
    awaiting_opponent: bool,
    reveal: bool,
}

impl MatchEngine {
    /// Creates a match in `Setup`.
    #[instrument]
    pub fn new(board_size: u8) -> Result<Self, MatchError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&board_size) {
            return Err(MatchError::InvalidBoardSize { size: board_size });
        }
        info!(board_size, "Creating match");
        Ok(Self {
            board_size,
            phase: Phase::Setup,
            player_poison: None,
            opponent_poison: None,
            claimed: ClaimedSet::new(board_size),
            turn_owner: None,
            active_side: None,
            winner: None,
            dice: None,
            round_history: RoundHistory::new(),
            round: 1,
            epoch: 0,
            awaiting_opponent: false,
            reveal: false,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Board edge.
    pub fn board_size(&self) -> u8 {
        self.board_size
    }

    /// Side whose turn is next during play.
    pub fn active_side(&self) -> Option<Side> {
        self.active_side
    }

    /// The side that started, fixed at the end of the turn-order draw.
    pub fn turn_owner(&self) -> Option<Side> {
        self.turn_owner
    }

    /// The winner, set iff the match has ended.
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// The most recent dice roll, tie or decisive.
    pub fn dice(&self) -> Option<DiceRoll> {
        self.dice
    }

    /// The ordered claim sequence.
    pub fn claimed(&self) -> &ClaimedSet {
        &self.claimed
    }

    /// Placement history across rounds, newest first.
    pub fn round_history(&self) -> &RoundHistory {
        &self.round_history
    }

    /// Current match generation; bumped on every restart.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while an opponent decision is outstanding.
    pub fn awaiting_opponent(&self) -> bool {
        self.awaiting_opponent
    }

    /// Which side made the claim at `index`, derived from turn order.
    pub fn claimant(&self, index: usize) -> Option<Side> {
        self.turn_owner.map(|owner| claimant_of(owner, index))
    }

    /// Poison coordinates, disclosed only after the match ends or while
    /// the reveal toggle is engaged.
    pub fn revealed_poisons(&self) -> Option<(Coord, Coord)> {
        if self.phase == Phase::Ended || self.reveal {
            self.player_poison.zip(self.opponent_poison)
        } else {
            None
        }
    }

    /// Flips the debug reveal toggle.
    pub fn toggle_reveal(&mut self) {
        self.reveal = !self.reveal;
        debug!(reveal = self.reveal, "Reveal toggled");
    }

    /// Changes the board size; honored only during setup.
    #[instrument(skip(self))]
    pub fn set_board_size(&mut self, size: u8) -> Result<(), MatchError> {
        if self.phase != Phase::Setup {
            return Err(MatchError::WrongPhase { phase: self.phase });
        }
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) {
            return Err(MatchError::InvalidBoardSize { size });
        }
        self.board_size = size;
        self.claimed = ClaimedSet::new(size);
        info!(size, "Board size updated");
        Ok(())
    }

    /// `Setup -> PlacingPoison`: clears all per-match fields. Placement
    /// history survives, since it spans rounds.
    #[instrument(skip(self))]
    pub fn start_game(&mut self) -> Result<(), MatchError> {
        if self.phase != Phase::Setup {
            return Err(MatchError::WrongPhase { phase: self.phase });
        }
        self.player_poison = None;
        self.opponent_poison = None;
        self.claimed = ClaimedSet::new(self.board_size);
        self.turn_owner = None;
        self.active_side = None;
        self.winner = None;
        self.dice = None;
        self.awaiting_opponent = false;
        self.reveal = false;
        self.phase = Phase::PlacingPoison;
        info!(round = self.round, "Poison placement started");
        Ok(())
    }

    /// Records the human poison. Accepted once per match; returns the
    /// ticket the runner must present when delivering the opponent's
    /// placement.
    #[instrument(skip(self))]
    pub fn place_human_poison(&mut self, c: Coord) -> Result<DecisionTicket, MatchError> {
        if self.phase != Phase::PlacingPoison {
            return Err(MatchError::WrongPhase { phase: self.phase });
        }
        if self.player_poison.is_some() {
            return Err(MatchError::PoisonAlreadyPlaced);
        }
        if !c.in_bounds(self.board_size) {
            return Err(MatchError::OutOfBounds { coord: c });
        }
        self.player_poison = Some(c);
        info!("Human poison placed");
        Ok(DecisionTicket { epoch: self.epoch })
    }

    /// Delivers the opponent's poison and moves to the turn-order draw.
    /// A round-history entry is appended only when both poisons are set.
    #[instrument(skip(self))]
    pub fn complete_poison_placement(
        &mut self,
        c: Coord,
        ticket: DecisionTicket,
    ) -> Result<(), MatchError> {
        if ticket.epoch != self.epoch {
            warn!(
                ticket_epoch = ticket.epoch,
                match_epoch = self.epoch,
                "Discarding poison placement from a restarted match"
            );
            return Err(MatchError::StaleTicket);
        }
        if self.phase != Phase::PlacingPoison {
            return Err(MatchError::WrongPhase { phase: self.phase });
        }
        if !c.in_bounds(self.board_size) {
            return Err(MatchError::OutOfBounds { coord: c });
        }
        self.opponent_poison = Some(c);

        if let (Some(player), Some(opponent)) = (self.player_poison, self.opponent_poison) {
            self.round_history.record(RoundEntry {
                round: self.round,
                player_poison: player,
                opponent_poison: opponent,
                timestamp: chrono::Utc::now(),
            });
            self.round += 1;
        }

        self.phase = Phase::TurnOrderDraw;
        info!("Both poisons placed, moving to turn-order draw");
        Ok(())
    }

    /// Rolls for the starting side. A tie stays in `TurnOrderDraw` for a
    /// redraw; a decisive roll fixes the turn owner and begins play.
    #[instrument(skip(self, rng))]
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Result<RollOutcome, MatchError> {
        if self.phase != Phase::TurnOrderDraw {
            return Err(MatchError::WrongPhase { phase: self.phase });
        }
        let outcome = decide_starting_side(rng);
        match outcome {
            RollOutcome::Decided { roll, starter } => {
                self.dice = Some(roll);
                self.turn_owner = Some(starter);
                self.active_side = Some(starter);
                self.phase = Phase::Playing;
                info!(starter = %starter, "Play started");
            }
            RollOutcome::Tie(roll) => {
                self.dice = Some(roll);
                debug!("Tie, staying in turn-order draw");
            }
        }
        Ok(outcome)
    }

    /// Claims a cell for `side`. Illegal claims are rejected without any
    /// state change. A claim of either poison cell, including the
    /// claimant's own, ends the match against the claimant.
    #[instrument(skip(self))]
    pub fn claim(&mut self, side: Side, c: Coord) -> ClaimOutcome {
        if self.awaiting_opponent {
            debug!("Claim refused while opponent decision outstanding");
            return ClaimOutcome::Rejected(ClaimRejection::AwaitingOpponent);
        }
        self.apply_claim(side, c)
    }

    /// Requests an opponent decision when the opponent is to move, entering
    /// the waiting sub-state. Used when the opponent starts the match.
    #[instrument(skip(self))]
    pub fn request_opponent_move(&mut self) -> Result<DecisionTicket, MatchError> {
        if self.phase != Phase::Playing || self.active_side != Some(Side::Opponent) {
            return Err(MatchError::NotAwaitingOpponent);
        }
        self.awaiting_opponent = true;
        Ok(DecisionTicket { epoch: self.epoch })
    }

    /// Applies a resolved opponent move. A stale ticket is discarded and
    /// the match is left untouched.
    #[instrument(skip(self))]
    pub fn apply_opponent_move(&mut self, c: Coord, ticket: DecisionTicket) -> ClaimOutcome {
        if ticket.epoch != self.epoch {
            warn!(
                ticket_epoch = ticket.epoch,
                match_epoch = self.epoch,
                "Discarding opponent move from a restarted match"
            );
            return ClaimOutcome::Stale;
        }
        self.awaiting_opponent = false;
        self.apply_claim(Side::Opponent, c)
    }

    /// Discards the current match and returns to `Setup`. Bumps the epoch
    /// so outstanding decision results can no longer be applied.
    #[instrument(skip(self))]
    pub fn restart(&mut self) {
        self.epoch += 1;
        self.phase = Phase::Setup;
        self.player_poison = None;
        self.opponent_poison = None;
        self.claimed = ClaimedSet::new(self.board_size);
        self.turn_owner = None;
        self.active_side = None;
        self.winner = None;
        self.dice = None;
        self.awaiting_opponent = false;
        self.reveal = false;
        info!(epoch = self.epoch, "Match restarted");
    }

    /// The opponent's poison, for the decision service only.
    pub(crate) fn opponent_poison_secret(&self) -> Option<Coord> {
        self.opponent_poison
    }

    fn apply_claim(&mut self, side: Side, c: Coord) -> ClaimOutcome {
        if self.phase != Phase::Playing {
            return ClaimOutcome::Rejected(ClaimRejection::NotPlaying);
        }
        if self.active_side != Some(side) {
            debug!(side = %side, "Out-of-turn claim refused");
            return ClaimOutcome::Rejected(ClaimRejection::NotYourTurn);
        }
        if !c.in_bounds(self.board_size) {
            return ClaimOutcome::Rejected(ClaimRejection::OutOfBounds);
        }
        if !self.claimed.push(c) {
            return ClaimOutcome::Rejected(ClaimRejection::AlreadyClaimed);
        }

        // Claiming any poison cell, even one's own, is fatal to the
        // claimant; the two poisons may share a cell.
        let poisoned = self.player_poison == Some(c) || self.opponent_poison == Some(c);
        if poisoned {
            let winner = side.opponent();
            self.winner = Some(winner);
            self.phase = Phase::Ended;
            self.reveal = true;
            info!(loser = %side, winner = %winner, "Poison claimed, match ended");
            return ClaimOutcome::Ended { winner };
        }

        let next = side.opponent();
        self.active_side = Some(next);
        if next == Side::Opponent {
            self.awaiting_opponent = true;
            debug!("Opponent decision requested");
            ClaimOutcome::AwaitingOpponent(DecisionTicket { epoch: self.epoch })
        } else {
            ClaimOutcome::Continued
        }
    }
}

/// Drives one match: owns the engine, the decision service, and the dice
/// RNG, and performs the collaborator round-trips the engine asks for.
#[derive(Debug)]
pub struct MatchRunner {
    engine: MatchEngine,
    service: DecisionService,
    rng: StdRng,
}

impl MatchRunner {
    /// Creates a runner with an entropy-seeded dice RNG.
    pub fn new(engine: MatchEngine, service: DecisionService) -> Self {
        Self {
            engine,
            service,
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a runner with a seeded dice RNG for reproducible matches.
    pub fn with_seed(engine: MatchEngine, service: DecisionService, seed: u64) -> Self {
        Self {
            engine,
            service,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Read access to the match state.
    pub fn engine(&self) -> &MatchEngine {
        &self.engine
    }

    /// Mutable access for setup-phase configuration and restart.
    pub fn engine_mut(&mut self) -> &mut MatchEngine {
        &mut self.engine
    }

    /// The collaborator debugging feed.
    pub fn decision_log(&self) -> &DecisionLog {
        self.service.log()
    }

    /// Begins poison placement.
    pub fn start_game(&mut self) -> Result<(), MatchError> {
        self.engine.start_game()
    }

    /// Places the human poison, then synchronously obtains and applies the
    /// opponent's placement.
    #[instrument(skip(self))]
    pub async fn place_poison(&mut self, c: Coord) -> Result<(), MatchError> {
        let ticket = self.engine.place_human_poison(c)?;
        let opponent = self
            .service
            .propose_poison_placement(
                self.engine.board_size(),
                self.engine.round_history(),
                ticket.epoch(),
            )
            .await;
        self.engine.complete_poison_placement(opponent, ticket)
    }

    /// Rolls for the starting side; when the opponent wins the draw, its
    /// opening move is driven immediately.
    #[instrument(skip(self))]
    pub async fn draw(&mut self) -> Result<RollOutcome, MatchError> {
        let outcome = self.engine.draw(&mut self.rng)?;
        if let RollOutcome::Decided {
            starter: Side::Opponent,
            ..
        } = outcome
        {
            let ticket = self.engine.request_opponent_move()?;
            self.drive_opponent(ticket).await;
        }
        Ok(outcome)
    }

    /// Applies a human claim, then drives opponent decisions for as long
    /// as the engine requests one.
    #[instrument(skip(self))]
    pub async fn claim(&mut self, c: Coord) -> ClaimOutcome {
        let mut outcome = self.engine.claim(Side::Player, c);
        while let ClaimOutcome::AwaitingOpponent(ticket) = outcome {
            outcome = self.drive_opponent(ticket).await;
        }
        outcome
    }

    async fn drive_opponent(&mut self, ticket: DecisionTicket) -> ClaimOutcome {
        let own_poison = match self.engine.opponent_poison_secret() {
            Some(p) => p,
            None => {
                // Poisons are always set before play begins.
                warn!("Opponent move requested before placement completed");
                return ClaimOutcome::Stale;
            }
        };
        let turn_owner = self.engine.turn_owner().unwrap_or(Side::Player);
        let coord = self
            .service
            .propose_turn_move(
                own_poison,
                self.engine.claimed(),
                self.engine.board_size(),
                turn_owner,
                ticket.epoch(),
            )
            .await;
        self.engine.apply_opponent_move(coord, ticket)
    }
}
