//! Power-ups: the roll that assigns them and the resolver that fires them.
//!
//! A power-up is rolled only when a tile receives a color (initial
//! generation or refill). When a matched tile carries one, its effect adds
//! more cells to the clear set:
//!
//! - `Line` - every non-obstacle cell in the tile's row
//! - `Cross` - every non-obstacle cell in the tile's row and column
//! - `ColorBomb` - every other tile sharing the trigger's color
//!
//! Only power-ups on matched tiles fire. A power-up tile caught inside
//! another one's effect is cleared with the rest and does not fire.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Tile};
use crate::config::ConfigError;
use crate::constants::{
    DEFAULT_COLOR_BOMB_PROBABILITY, DEFAULT_CROSS_PROBABILITY, DEFAULT_LINE_PROBABILITY,
    DEFAULT_POWERUP_CHANCE,
};
use crate::matching::MatchSet;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUp {
    Line,
    Cross,
    ColorBomb,
}

/// Relative probability of one power-up kind.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerupWeight {
    pub kind: PowerUp,
    pub probability: f32,
}

/// How often power-ups appear and which kinds are drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupProfile {
    /// Probability in `[0, 1]` that a freshly colored tile gets a power-up.
    pub chance: f32,
    /// Kinds and their relative probabilities, in table order.
    pub kinds: Vec<PowerupWeight>,
}

impl Default for PowerupProfile {
    fn default() -> Self {
        Self {
            chance: DEFAULT_POWERUP_CHANCE,
            kinds: vec![
                PowerupWeight {
                    kind: PowerUp::Line,
                    probability: DEFAULT_LINE_PROBABILITY,
                },
                PowerupWeight {
                    kind: PowerUp::Cross,
                    probability: DEFAULT_CROSS_PROBABILITY,
                },
                PowerupWeight {
                    kind: PowerUp::ColorBomb,
                    probability: DEFAULT_COLOR_BOMB_PROBABILITY,
                },
            ],
        }
    }
}

impl PowerupProfile {
    /// A profile that never produces power-ups.
    pub fn disabled() -> Self {
        Self {
            chance: 0.0,
            kinds: Vec::new(),
        }
    }
}

/// Prefix-sum table built once from a [`PowerupProfile`].
#[derive(Clone, Debug, PartialEq)]
pub struct PowerupTable {
    chance: f32,
    cumulative: Vec<(f32, PowerUp)>,
}

impl PowerupTable {
    pub fn new(profile: &PowerupProfile) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&profile.chance) {
            return Err(ConfigError::InvalidChance(profile.chance));
        }
        if profile.chance > 0.0 && profile.kinds.is_empty() {
            return Err(ConfigError::NoPowerupKinds);
        }

        let mut cumulative = Vec::with_capacity(profile.kinds.len());
        let mut sum = 0.0f32;
        for weight in &profile.kinds {
            if !weight.probability.is_finite() || weight.probability < 0.0 {
                return Err(ConfigError::InvalidProbability {
                    kind: weight.kind,
                    probability: weight.probability,
                });
            }
            sum += weight.probability;
            cumulative.push((sum, weight.kind));
        }
        // Pin the last prefix so every draw in [0, 1) finds an entry even
        // when the probabilities do not add up to exactly 1.0.
        if let Some(last) = cumulative.last_mut() {
            last.0 = 1.0;
        }

        Ok(Self {
            chance: profile.chance,
            cumulative,
        })
    }

    /// Pick the first kind whose prefix is `>= draw`.
    pub fn select(&self, draw: f32) -> Option<PowerUp> {
        let draw = draw.clamp(0.0, 1.0);
        self.cumulative
            .iter()
            .find(|(prefix, _)| *prefix >= draw)
            .map(|&(_, kind)| kind)
    }

    /// Roll for a power-up: one draw against the chance, one for the kind.
    pub fn roll(&self, rng: &mut fastrand::Rng) -> Option<PowerUp> {
        if self.cumulative.is_empty() || rng.f32() >= self.chance {
            return None;
        }
        self.select(rng.f32())
    }
}

/// The final set of cells to clear and the power-ups that fired.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    pub cleared: BTreeSet<usize>,
    pub triggered: Vec<(usize, PowerUp)>,
}

impl Expansion {
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
    }
}

/// Expand a match set by the power-ups of the tiles in it.
///
/// Only tiles in `matches` fire. A power-up tile that is merely hit by
/// another power-up's effect is cleared without firing.
pub fn expand(board: &Board, matches: &MatchSet) -> Expansion {
    let mut cleared = matches.clone();
    let mut triggered = Vec::new();

    for &index in matches {
        let tile = &board[index];
        let Some(power_up) = tile.power_up else {
            continue;
        };
        triggered.push((index, power_up));
        cleared.extend(effect(board, tile, power_up));
    }

    Expansion { cleared, triggered }
}

/// Cells hit by a single power-up, before de-duplication.
fn effect(board: &Board, tile: &Tile, power_up: PowerUp) -> Vec<usize> {
    let grid = board.grid();
    let (x, y) = grid.index_to_coord(tile.index);
    let not_obstacle = |i: &usize| !board[*i].is_obstacle();
    match power_up {
        PowerUp::Line => grid.row_indices(y).filter(not_obstacle).collect(),
        PowerUp::Cross => grid
            .row_indices(y)
            .chain(grid.column_indices(x))
            .filter(not_obstacle)
            .collect(),
        PowerUp::ColorBomb => board
            .tiles()
            .iter()
            .filter(|t| t.index != tile.index && t.matches(tile))
            .map(|t| t.index)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(indices: &[usize]) -> MatchSet {
        indices.iter().copied().collect()
    }

    #[test]
    fn test_line_skips_obstacles() {
        let board = Board::from_rows(&[
            "3 4 3 4", //
            "0 0- # 2",
            "1 2 1 2",
        ])
        .unwrap();
        // Row y=1 holds indices 4..8, with the obstacle at 6
        let expansion = expand(&board, &set(&[5]));
        assert_eq!(expansion.cleared, set(&[4, 5, 7]));
        assert_eq!(expansion.triggered, vec![(5, PowerUp::Line)]);
    }

    #[test]
    fn test_cross_row_and_column() {
        let board = Board::from_rows(&[
            "3 # 3", //
            "0 1+ 2",
            "1 2 1",
        ])
        .unwrap();
        // Cross at index 4 (x=1, y=1); column 1 holds 1, 4 and the obstacle at 7
        let expansion = expand(&board, &set(&[4]));
        assert_eq!(expansion.cleared, set(&[1, 3, 4, 5]));
    }

    #[test]
    fn test_color_bomb_hits_same_color() {
        let board = Board::from_rows(&[
            "2 0 2", //
            "1 2* 0",
            "2 1 #",
        ])
        .unwrap();
        let expansion = expand(&board, &set(&[4]));
        assert_eq!(expansion.cleared, set(&[0, 4, 6, 8]));
    }

    #[test]
    fn test_power_up_hit_by_effect_does_not_fire() {
        // Line at 0 clears its row, which holds the Cross at 2; the Cross
        // is cleared but its column (5, 8) is not
        let board = Board::from_rows(&[
            "0 1 2", //
            "1 2 3",
            "4- 1 0+",
        ])
        .unwrap();
        let expansion = expand(&board, &set(&[0]));
        assert_eq!(expansion.cleared, set(&[0, 1, 2]));
        assert_eq!(expansion.triggered, vec![(0, PowerUp::Line)]);
    }

    #[test]
    fn test_every_matched_power_up_fires() {
        let board = Board::from_rows(&[
            "3 1 2", //
            "0- 0+ 0",
            "2 3 1",
        ])
        .unwrap();
        let expansion = expand(&board, &set(&[3, 4, 5]));
        assert_eq!(expansion.cleared, set(&[1, 3, 4, 5, 7]));
        assert_eq!(
            expansion.triggered,
            vec![(3, PowerUp::Line), (4, PowerUp::Cross)]
        );
    }

    #[test]
    fn test_no_power_up_no_expansion() {
        let board = Board::from_rows(&["0 0 0", "1 2 1"]).unwrap();
        let matches = set(&[3, 4, 5]);
        let expansion = expand(&board, &matches);
        assert_eq!(expansion.cleared, matches);
        assert!(expansion.triggered.is_empty());
    }

    #[test]
    fn test_cumulative_table_selection() {
        let table = PowerupTable::new(&PowerupProfile {
            chance: 1.0,
            kinds: vec![
                PowerupWeight {
                    kind: PowerUp::Line,
                    probability: 0.25,
                },
                PowerupWeight {
                    kind: PowerUp::Cross,
                    probability: 0.25,
                },
                PowerupWeight {
                    kind: PowerUp::ColorBomb,
                    probability: 0.25,
                },
            ],
        })
        .unwrap();
        assert_eq!(table.select(0.0), Some(PowerUp::Line));
        // Ties go to the first prefix that reaches the draw
        assert_eq!(table.select(0.25), Some(PowerUp::Line));
        assert_eq!(table.select(0.3), Some(PowerUp::Cross));
        // Last prefix is pinned to 1.0 even though the weights sum to 0.75
        assert_eq!(table.select(0.9), Some(PowerUp::ColorBomb));
        assert_eq!(table.select(1.0), Some(PowerUp::ColorBomb));
    }

    #[test]
    fn test_roll_respects_chance() {
        let mut rng = fastrand::Rng::with_seed(7);
        let never = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
        let always = PowerupTable::new(&PowerupProfile {
            chance: 1.0,
            ..PowerupProfile::default()
        })
        .unwrap();
        for _ in 0..100 {
            assert_eq!(never.roll(&mut rng), None);
            assert!(always.roll(&mut rng).is_some());
        }
    }

    #[test]
    fn test_invalid_profiles() {
        let bad_chance = PowerupProfile {
            chance: 1.5,
            ..PowerupProfile::default()
        };
        assert!(matches!(
            PowerupTable::new(&bad_chance),
            Err(ConfigError::InvalidChance(_))
        ));

        let no_kinds = PowerupProfile {
            chance: 0.5,
            kinds: Vec::new(),
        };
        assert_eq!(
            PowerupTable::new(&no_kinds),
            Err(ConfigError::NoPowerupKinds)
        );
    }
}
