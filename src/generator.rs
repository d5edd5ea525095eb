//! Board generation and the tile factory shared with refills.
//!
//! The initial board places obstacles from the static layout and colors
//! every other cell at random. A color that would complete a run of
//! [`MATCH`] with the cells to its left or below is rerolled, so a freshly
//! generated board starts without matches. Every colored tile also gets a
//! power-up roll.

use log::info;

use crate::board::{Board, ColorId, Tile};
use crate::config::{BoardConfig, ConfigError};
use crate::constants::MATCH;
use crate::grid::{Direction, Grid};
use crate::powerup::{PowerUp, PowerupTable};

/// Source of fresh tile identities (color + power-up).
///
/// Owns the random stream so a seeded factory reproduces the same board
/// and the same refills.
#[derive(Clone, Debug)]
pub struct TileFactory {
    rng: fastrand::Rng,
    colors: ColorId,
    powerups: PowerupTable,
}

impl TileFactory {
    /// # Panics
    /// If `colors` is zero; there would be nothing to draw from.
    pub fn new(colors: ColorId, powerups: PowerupTable, seed: Option<u64>) -> Self {
        assert!(colors > 0, "tile factory needs at least one color");
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            rng,
            colors,
            powerups,
        }
    }

    pub fn color(&mut self) -> ColorId {
        self.rng.u8(..self.colors)
    }

    /// A random color not in `excluded`, or any color if all are excluded.
    pub fn color_excluding(&mut self, excluded: &[ColorId]) -> ColorId {
        let allowed: Vec<ColorId> = (0..self.colors).filter(|c| !excluded.contains(c)).collect();
        if allowed.is_empty() {
            return self.color();
        }
        allowed[self.rng.usize(..allowed.len())]
    }

    pub fn power_up(&mut self) -> Option<PowerUp> {
        self.powerups.roll(&mut self.rng)
    }

    /// Give `tile` a fresh color and power-up roll, keeping its index.
    pub fn recolor(&mut self, tile: &mut Tile) {
        let color = self.color();
        *tile = Tile::normal(color, tile.index).with_power_up(self.power_up());
    }
}

/// Validate `config` and build its initial board plus the factory that
/// will keep producing refill tiles from the same random stream.
pub fn generate(config: &BoardConfig) -> Result<(Board, TileFactory), ConfigError> {
    config.validate()?;
    let grid = config.grid();
    let obstacles = config.obstacle_indices();
    let powerups = PowerupTable::new(&config.powerups)?;
    let mut factory = TileFactory::new(config.colors, powerups, config.seed);

    let mut tiles: Vec<Tile> = Vec::with_capacity(grid.len());
    for index in 0..grid.len() {
        if obstacles.contains(&index) {
            tiles.push(Tile::obstacle(index));
            continue;
        }
        let excluded: Vec<ColorId> = [Direction::Left, Direction::Down]
            .into_iter()
            .filter_map(|d| run_color(&tiles, &grid, index, d))
            .collect();
        let color = factory.color_excluding(&excluded);
        tiles.push(Tile::normal(color, index).with_power_up(factory.power_up()));
    }

    let board = Board::new(grid, tiles, config.layout)?;
    info!(
        "generated {}x{} board: {} colors, {} obstacles, seed {:?}",
        config.width,
        config.height,
        config.colors,
        obstacles.len(),
        config.seed
    );
    Ok((board, factory))
}

/// The color shared by the `MATCH - 1` already-generated cells in
/// `direction` from `index`, if they all share one.
fn run_color(
    tiles: &[Tile],
    grid: &Grid,
    index: usize,
    direction: Direction,
) -> Option<ColorId> {
    let mut current = index;
    let mut color = None;
    for _ in 0..MATCH - 1 {
        current = grid.step(direction, current)?;
        let c = tiles[current].color()?;
        match color {
            None => color = Some(c),
            Some(prev) if prev != c => return None,
            Some(_) => {}
        }
    }
    color
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::find_all_matches;
    use crate::powerup::PowerupProfile;

    fn config(seed: u64) -> BoardConfig {
        BoardConfig {
            width: 7,
            height: 6,
            colors: 3,
            obstacles: vec![[3, 0], [3, 1], [0, 5]],
            seed: Some(seed),
            ..BoardConfig::default()
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let (a, _) = generate(&config(11)).unwrap();
        let (b, _) = generate(&config(11)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_obstacles_placed_and_uncolored() {
        let (board, _) = generate(&config(3)).unwrap();
        let grid = board.grid();
        for (x, y) in [(3, 0), (3, 1), (0, 5)] {
            assert!(board[grid.coord_to_index(x, y)].is_obstacle());
        }
        let obstacle_count = board.tiles().iter().filter(|t| t.is_obstacle()).count();
        assert_eq!(obstacle_count, 3);
        for tile in board.tiles().iter().filter(|t| t.is_obstacle()) {
            assert_eq!(tile.power_up, None);
        }
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_generated_board_has_no_matches() {
        for seed in 0..50 {
            let (board, _) = generate(&config(seed)).unwrap();
            assert!(
                find_all_matches(&board).is_empty(),
                "seed {seed} produced a match:\n{board}"
            );
        }
    }

    #[test]
    fn test_colors_within_range() {
        let (board, _) = generate(&config(5)).unwrap();
        assert!(board.tiles().iter().filter_map(Tile::color).all(|c| c < 3));
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let bad = BoardConfig {
            width: 2,
            height: 2,
            obstacles: vec![[0, 0], [0, 1]],
            ..BoardConfig::default()
        };
        assert_eq!(
            generate(&bad).unwrap_err(),
            ConfigError::ColumnBlocked { column: 0 }
        );
    }

    #[test]
    fn test_recolor_keeps_index() {
        let table = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
        let mut factory = TileFactory::new(4, table, Some(1));
        let mut tile = Tile::normal(0, 17);
        factory.recolor(&mut tile);
        assert_eq!(tile.index, 17);
        assert!(tile.color().unwrap() < 4);
        assert_eq!(tile.power_up, None);
    }

    #[test]
    fn test_color_excluding() {
        let table = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
        let mut factory = TileFactory::new(3, table, Some(2));
        for _ in 0..50 {
            let c = factory.color_excluding(&[0, 2]);
            assert_eq!(c, 1);
        }
        // Everything excluded falls back to any color
        assert!(factory.color_excluding(&[0, 1, 2]) < 3);
    }

    #[test]
    #[should_panic(expected = "at least one color")]
    fn test_factory_rejects_zero_colors() {
        let table = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
        TileFactory::new(0, table, Some(1));
    }
}
