//! Grid model: coordinates, the claim sequence, and unclaimed-cell enumeration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Smallest playable board edge.
pub const MIN_BOARD_SIZE: u8 = 3;
/// Largest playable board edge.
pub const MAX_BOARD_SIZE: u8 = 10;

/// A cell on the board. Components are 1-based: both lie in `[1, size]`
/// for a board of edge `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column, 1-based.
    pub x: u8,
    /// Row, 1-based.
    pub y: u8,
}

impl Coord {
    /// Creates a coordinate. No bounds check; use [`Coord::in_bounds`].
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// True iff both components lie in `[1, size]`.
    pub fn in_bounds(self, size: u8) -> bool {
        (1..=size).contains(&self.x) && (1..=size).contains(&self.y)
    }

    /// Canonical set key for a board of edge `size`.
    fn key(self, size: u8) -> u16 {
        u16::from(self.x) * (u16::from(size) + 1) + u16::from(self.y)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The authoritative turn history: an append-only ordered sequence of
/// claimed cells, backed by a keyed set so membership is O(1) and a
/// duplicate can never be appended.
#[derive(Debug, Clone)]
pub struct ClaimedSet {
    size: u8,
    order: Vec<Coord>,
    keys: HashSet<u16>,
}

impl ClaimedSet {
    /// Creates an empty claim sequence for a board of edge `size`.
    pub fn new(size: u8) -> Self {
        Self {
            size,
            order: Vec::new(),
            keys: HashSet::new(),
        }
    }

    /// Board edge this sequence belongs to.
    pub fn size(&self) -> u8 {
        self.size
    }

    /// True iff `c` has already been claimed.
    pub fn contains(&self, c: Coord) -> bool {
        self.keys.contains(&c.key(self.size))
    }

    /// Appends a claim. Returns `false` (and leaves the sequence
    /// unchanged) if `c` is already present.
    pub fn push(&mut self, c: Coord) -> bool {
        if !self.keys.insert(c.key(self.size)) {
            warn!(coord = %c, "Refusing duplicate claim");
            return false;
        }
        self.order.push(c);
        debug!(coord = %c, total = self.order.len(), "Claim appended");
        true
    }

    /// The claims in append order.
    pub fn as_slice(&self) -> &[Coord] {
        &self.order
    }

    /// Number of claims so far.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True iff no cell has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// All in-bounds cells not in `claimed` and not in `excluded`, in
/// row-major order. The deterministic order keeps fallback selection
/// reproducible under a seeded RNG.
pub fn enumerate_unclaimed(size: u8, claimed: &ClaimedSet, excluded: &[Coord]) -> Vec<Coord> {
    let mut free = Vec::new();
    for y in 1..=size {
        for x in 1..=size {
            let c = Coord::new(x, y);
            if !claimed.contains(c) && !excluded.contains(&c) {
                free.push(c);
            }
        }
    }
    free
}
