//! Swap handling and the stabilization loop.
//!
//! The [`Engine`] owns the board and the tile factory for one session and
//! is the only thing that mutates them. A swap resolves as a chain of
//! discrete passes:
//!
//! 1. [`Engine::request_swap`] validates and performs the swap. Without a
//!    match it swaps back and reports [`Event::SwapReverted`]. With a match
//!    it clears, expands power-ups, cascades, and returns the first batch.
//! 2. Each [`Engine::advance`] re-checks the cells the last batch landed on.
//!    New matches produce another clear + cascade batch; otherwise the
//!    engine reports [`Event::BoardSettled`] and becomes idle.
//!
//! Between passes the engine is busy and rejects new swaps, so a
//! presentation layer can animate every batch before asking for the next.
//! [`Engine::swap`] runs the whole chain in one call.

use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::board::{Board, BoardError};
use crate::cascade::{CascadeError, MoveRequest, Origin, cascade};
use crate::config::{BoardConfig, ConfigError};
use crate::constants::MAX_CASCADE_PASSES;
use crate::generator::{TileFactory, generate};
use crate::matching::{MatchSet, find_matches_at};
use crate::powerup::{Expansion, PowerUp, expand};

/// Why a swap command was refused. The board is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A previous swap is still resolving.
    Busy,
    OutOfRange(usize),
    SameTile,
    NotAdjacent,
    Obstacle(usize),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Busy => write!(f, "busy"),
            RejectReason::OutOfRange(i) => write!(f, "index {i} out of range"),
            RejectReason::SameTile => write!(f, "same tile"),
            RejectReason::NotAdjacent => write!(f, "not adjacent"),
            RejectReason::Obstacle(i) => write!(f, "obstacle at {i}"),
        }
    }
}

/// Board mutations reported to the presentation layer, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Cells emptied by one pass, sorted, and the power-ups that fired.
    TilesCleared {
        indices: Vec<usize>,
        power_ups: Vec<(usize, PowerUp)>,
    },
    /// Every relocation of one pass, already applied to the board.
    TilesMoved(Vec<MoveRequest>),
    SwapRejected(RejectReason),
    /// The swap produced no match and was undone.
    SwapReverted(usize, usize),
    BoardSettled,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::TilesCleared { indices, power_ups } => {
                write!(f, "cleared")?;
                for i in indices {
                    write!(f, " {i}")?;
                }
                for (i, kind) in power_ups {
                    write!(f, " {i}:{kind:?}")?;
                }
                Ok(())
            }
            Event::TilesMoved(moves) => {
                write!(f, "moved")?;
                for m in moves {
                    match m.origin {
                        Origin::Board => write!(f, " {}->{}", m.tile_index, m.target_index)?,
                        Origin::AboveColumn { offset } => {
                            write!(f, " ^{offset}->{}", m.target_index)?
                        }
                    }
                }
                Ok(())
            }
            Event::SwapRejected(reason) => write!(f, "rejected {reason}"),
            Event::SwapReverted(a, b) => write!(f, "reverted {a} {b}"),
            Event::BoardSettled => write!(f, "settled"),
        }
    }
}

/// Fatal failures. Rejected swaps are events, not errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Cascade(#[from] CascadeError),
    #[error("board did not settle within {0} cascade passes")]
    CascadeLimit(usize),
}

/// One play session: the board, its refill stream, and the busy gate.
#[derive(Debug, Clone)]
pub struct Engine {
    board: Board,
    factory: TileFactory,
    busy: bool,
    /// Cells the last batch landed on, re-checked by the next pass.
    pending: Vec<usize>,
    passes: usize,
    max_passes: usize,
}

impl Engine {
    /// Validate `config` and generate the initial board.
    pub fn new(config: &BoardConfig) -> Result<Self, EngineError> {
        let (board, factory) = generate(config)?;
        Ok(Self::with_board(board, factory))
    }

    /// Start a session on an existing board; refills come from `factory`.
    pub fn with_board(board: Board, factory: TileFactory) -> Self {
        Self {
            board,
            factory,
            busy: false,
            pending: Vec::new(),
            passes: 0,
            max_passes: MAX_CASCADE_PASSES,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_max_passes(&mut self, max_passes: usize) {
        self.max_passes = max_passes;
    }

    /// Replace the board, e.g. when a new level is loaded. Refused while a
    /// swap is resolving.
    pub fn load_board(&mut self, board: Board) -> Result<(), RejectReason> {
        if self.busy {
            return Err(RejectReason::Busy);
        }
        self.board = board;
        self.pending.clear();
        Ok(())
    }

    /// What clearing from `index` would remove right now, without touching
    /// the board.
    pub fn probe(&self, index: usize) -> Result<Option<Expansion>, BoardError> {
        self.board.get(index)?;
        let matches = find_matches_at(&self.board, [index]);
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(expand(&self.board, &matches)))
    }

    fn validate_swap(&self, a: usize, b: usize) -> Option<RejectReason> {
        if self.busy {
            return Some(RejectReason::Busy);
        }
        for index in [a, b] {
            match self.board.get(index) {
                Err(_) => return Some(RejectReason::OutOfRange(index)),
                Ok(tile) if tile.is_obstacle() => return Some(RejectReason::Obstacle(index)),
                Ok(_) => {}
            }
        }
        if a == b {
            return Some(RejectReason::SameTile);
        }
        if !self.board.grid().adjacent(a, b) {
            return Some(RejectReason::NotAdjacent);
        }
        None
    }

    /// Swap the tiles at `a` and `b` and run the first pass.
    ///
    /// Returns the events up to the first settle point. If the engine is
    /// still busy afterwards, call [`Engine::advance`] for the rest.
    pub fn request_swap(&mut self, a: usize, b: usize) -> Result<Vec<Event>, EngineError> {
        if let Some(reason) = self.validate_swap(a, b) {
            debug!("swap {a} <-> {b} rejected: {reason}");
            return Ok(vec![Event::SwapRejected(reason)]);
        }

        self.busy = true;
        self.board.swap_occupants(a, b)?;
        let matches = find_matches_at(&self.board, [a, b]);
        if matches.is_empty() {
            self.board.swap_occupants(a, b)?;
            self.busy = false;
            debug!("swap {a} <-> {b} made no match, reverted");
            return Ok(vec![Event::SwapReverted(a, b)]);
        }

        self.passes = 0;
        self.run_pass(matches)
    }

    /// Run the next pass of a resolving swap. Does nothing when idle.
    pub fn advance(&mut self) -> Result<Vec<Event>, EngineError> {
        if !self.busy {
            return Ok(Vec::new());
        }
        let seeds = std::mem::take(&mut self.pending);
        let matches = find_matches_at(&self.board, seeds);
        if matches.is_empty() {
            self.busy = false;
            debug!("board settled after {} passes", self.passes);
            return Ok(vec![Event::BoardSettled]);
        }
        self.run_pass(matches)
    }

    /// Advance until the board settles.
    pub fn settle(&mut self) -> Result<Vec<Event>, EngineError> {
        let mut events = Vec::new();
        while self.busy {
            events.extend(self.advance()?);
        }
        Ok(events)
    }

    /// Swap and resolve the whole chain.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<Vec<Event>, EngineError> {
        let mut events = self.request_swap(a, b)?;
        events.extend(self.settle()?);
        Ok(events)
    }

    fn run_pass(&mut self, matches: MatchSet) -> Result<Vec<Event>, EngineError> {
        let result = self.clear_and_cascade(matches);
        if result.is_err() {
            self.busy = false;
            self.pending.clear();
        }
        result
    }

    fn clear_and_cascade(&mut self, matches: MatchSet) -> Result<Vec<Event>, EngineError> {
        self.passes += 1;
        if self.passes > self.max_passes {
            warn!("cascade chain exceeded {} passes", self.max_passes);
            return Err(EngineError::CascadeLimit(self.max_passes));
        }

        let expansion = expand(&self.board, &matches);
        let moves = cascade(&mut self.board, &expansion.cleared, &mut self.factory)?;
        self.board.apply_moves(&moves);
        self.pending = moves.iter().map(|m| m.target_index).collect();

        debug!(
            "pass {}: cleared {} cells ({} power-ups), {} moves",
            self.passes,
            expansion.cleared.len(),
            expansion.triggered.len(),
            moves.len()
        );
        Ok(vec![
            Event::TilesCleared {
                indices: expansion.cleared.into_iter().collect(),
                power_ups: expansion.triggered,
            },
            Event::TilesMoved(moves),
        ])
    }
}
