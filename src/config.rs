//! Board configuration.
//!
//! A [`BoardConfig`] describes everything needed to build the initial
//! board: dimensions, color count, the fixed obstacle layout, the
//! power-up profile, an optional seed, and the world layout used for tile
//! locations. It can be loaded from JSON; every field has a default.
//!
//! ```json
//! {
//!   "width": 6,
//!   "height": 6,
//!   "colors": 4,
//!   "obstacles": [[2, 0], [2, 1]],
//!   "powerups": { "chance": 0.05, "kinds": [{ "kind": "line", "probability": 1.0 }] },
//!   "seed": 42
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{BoardError, Layout};
use crate::constants::{
    DEFAULT_COLORS, DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_COLORS, MAX_DIMENSION, MIN_COLORS,
};
use crate::grid::Grid;
use crate::powerup::{PowerUp, PowerupProfile, PowerupTable};

/// A board layout that cannot be played. Raised before any board exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("board must have at least one cell (got {width}x{height})")]
    EmptyBoard { width: usize, height: usize },
    #[error("board {width}x{height} exceeds the {max}x{max} limit")]
    TooLarge {
        width: usize,
        height: usize,
        max: usize,
    },
    #[error("color count {colors} is outside {min}..={max}")]
    ColorCount { colors: u8, min: u8, max: u8 },
    #[error("obstacle ({x}, {y}) is outside the board")]
    ObstacleOutOfBounds { x: usize, y: usize },
    #[error("obstacle ({x}, {y}) is listed twice")]
    DuplicateObstacle { x: usize, y: usize },
    #[error("column {column} is entirely obstacles and can never be refilled")]
    ColumnBlocked { column: usize },
    #[error("power-up chance {0} is outside [0, 1]")]
    InvalidChance(f32),
    #[error("power-up chance is positive but no power-up kinds are configured")]
    NoPowerupKinds,
    #[error("invalid probability {probability} for power-up {kind:?}")]
    InvalidProbability { kind: PowerUp, probability: f32 },
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub colors: u8,
    /// Fixed obstacle cells as `[x, y]`, `y = 0` being the bottom row.
    pub obstacles: Vec<[usize; 2]>,
    pub powerups: PowerupProfile,
    /// Pins the random stream for reproducible boards.
    pub seed: Option<u64>,
    pub layout: Layout,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            colors: DEFAULT_COLORS,
            obstacles: Vec::new(),
            powerups: PowerupProfile::default(),
            seed: None,
            layout: Layout::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading board config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing board config {}", path.display()))
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height)
    }

    /// Obstacle cells as board indices. Assumes a validated config.
    pub fn obstacle_indices(&self) -> HashSet<usize> {
        let grid = self.grid();
        self.obstacles
            .iter()
            .map(|&[x, y]| grid.coord_to_index(x, y))
            .collect()
    }

    /// Reject layouts that cannot be played.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Checked before anything multiplies or allocates by the dimensions.
        let too_large = self.width > MAX_DIMENSION
            || self.height > MAX_DIMENSION
            || self.width.checked_mul(self.height).is_none();
        if too_large {
            return Err(ConfigError::TooLarge {
                width: self.width,
                height: self.height,
                max: MAX_DIMENSION,
            });
        }
        let grid = self.grid();
        if grid.is_empty() {
            return Err(ConfigError::EmptyBoard {
                width: self.width,
                height: self.height,
            });
        }
        if !(MIN_COLORS..=MAX_COLORS).contains(&self.colors) {
            return Err(ConfigError::ColorCount {
                colors: self.colors,
                min: MIN_COLORS,
                max: MAX_COLORS,
            });
        }

        let mut seen = HashSet::new();
        let mut blocked_per_column = vec![0usize; self.width];
        for &[x, y] in &self.obstacles {
            if x >= self.width || y >= self.height {
                return Err(ConfigError::ObstacleOutOfBounds { x, y });
            }
            if !seen.insert((x, y)) {
                return Err(ConfigError::DuplicateObstacle { x, y });
            }
            blocked_per_column[x] += 1;
        }
        if let Some(column) = blocked_per_column.iter().position(|&n| n == self.height) {
            return Err(ConfigError::ColumnBlocked { column });
        }

        PowerupTable::new(&self.powerups)?;
        Ok(())
    }
}
