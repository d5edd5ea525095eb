//! Board state: the tiles resident at every cell and their world locations.
//!
//! The board is a passive container. It never starts a match check or a
//! cascade on its own; [`crate::engine::Engine`] drives it. Tiles are plain
//! values identified by the index they occupy, so "moving" a tile means
//! relabeling it with a new index.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cascade::MoveRequest;
use crate::grid::Grid;
use crate::powerup::PowerUp;

/// Color of a normal tile, `0..colors`.
pub type ColorId = u8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("index {index} is out of range for a board of {len} cells")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("board has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("invalid tile token '{token}' in row {row}")]
    InvalidToken { row: usize, token: String },
    #[error("table length mismatch: {tiles} tiles, {locations} locations, {cells} cells")]
    LengthMismatch {
        tiles: usize,
        locations: usize,
        cells: usize,
    },
    #[error("tile stored at {slot} believes it is at {index}")]
    Misindexed { slot: usize, index: usize },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    Normal(ColorId),
    Obstacle,
}

/// A single tile and the cell it currently occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    pub kind: TileKind,
    pub power_up: Option<PowerUp>,
    pub index: usize,
}

impl Tile {
    pub fn normal(color: ColorId, index: usize) -> Self {
        Self {
            kind: TileKind::Normal(color),
            power_up: None,
            index,
        }
    }

    pub fn obstacle(index: usize) -> Self {
        Self {
            kind: TileKind::Obstacle,
            power_up: None,
            index,
        }
    }

    pub fn with_power_up(mut self, power_up: Option<PowerUp>) -> Self {
        self.power_up = power_up;
        self
    }

    /// The tile's color, `None` for obstacles.
    #[inline]
    pub fn color(&self) -> Option<ColorId> {
        match self.kind {
            TileKind::Normal(c) => Some(c),
            TileKind::Obstacle => None,
        }
    }

    #[inline]
    pub fn is_obstacle(&self) -> bool {
        self.kind == TileKind::Obstacle
    }

    /// The matching predicate: same color, and neither tile is an obstacle.
    ///
    /// Two obstacles never match each other.
    #[inline]
    pub fn matches(&self, other: &Tile) -> bool {
        match (self.color(), other.color()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// World-space position of a cell, consumed only by presentation code.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f32,
    pub y: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TileLocation {
    pub index: usize,
    pub location: Location,
}

/// How cells map to world positions: the board is centered on `origin`
/// with `spacing` between neighbouring cell centers.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub origin: Location,
    pub spacing: Location,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            origin: Location::default(),
            spacing: Location {
                x: crate::constants::DEFAULT_SPACING,
                y: crate::constants::DEFAULT_SPACING,
            },
        }
    }
}

impl Layout {
    /// Position of cell `(x, y)`; `y` may exceed the board for staging rows.
    pub fn location(&self, grid: &Grid, x: usize, y: usize) -> Location {
        let start_x =
            self.origin.x - (grid.width as f32 * self.spacing.x) / 2.0 + self.spacing.x / 2.0;
        let start_y =
            self.origin.y - (grid.height as f32 * self.spacing.y) / 2.0 + self.spacing.y / 2.0;
        Location {
            x: start_x + self.spacing.x * x as f32,
            y: start_y + self.spacing.y * y as f32,
        }
    }

    fn locations(&self, grid: &Grid) -> Vec<TileLocation> {
        (0..grid.len())
            .map(|index| {
                let (x, y) = grid.index_to_coord(index);
                TileLocation {
                    index,
                    location: self.location(grid, x, y),
                }
            })
            .collect()
    }
}

/// The full grid of tiles for one play session.
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    grid: Grid,
    tiles: Vec<Tile>,
    locations: Vec<TileLocation>,
    layout: Layout,
}

impl Board {
    /// Build a board from row-major tiles. Each tile is relabeled with the
    /// index it is stored at.
    pub fn new(grid: Grid, mut tiles: Vec<Tile>, layout: Layout) -> Result<Self, BoardError> {
        if grid.is_empty() {
            return Err(BoardError::Empty);
        }
        if tiles.len() != grid.len() {
            return Err(BoardError::LengthMismatch {
                tiles: tiles.len(),
                locations: grid.len(),
                cells: grid.len(),
            });
        }
        for (i, tile) in tiles.iter_mut().enumerate() {
            tile.index = i;
        }
        let locations = layout.locations(&grid);
        Ok(Self {
            grid,
            tiles,
            locations,
            layout,
        })
    }

    /// Parse a board from text rows, top row first.
    ///
    /// Tokens are whitespace separated: a color number, `#` for an
    /// obstacle, or a color followed by `-` (Line), `+` (Cross) or
    /// `*` (ColorBomb).
    pub fn from_rows(rows: &[&str]) -> Result<Self, BoardError> {
        let height = rows.len();
        let mut parsed: Vec<Vec<(TileKind, Option<PowerUp>)>> = Vec::with_capacity(height);
        for (row, line) in rows.iter().enumerate() {
            let cells = line
                .split_whitespace()
                .map(|token| parse_token(token).ok_or_else(|| BoardError::InvalidToken {
                    row,
                    token: token.to_string(),
                }))
                .collect::<Result<Vec<_>, _>>()?;
            parsed.push(cells);
        }

        let width = parsed.first().map_or(0, Vec::len);
        for (row, cells) in parsed.iter().enumerate() {
            if cells.len() != width {
                return Err(BoardError::RaggedRow {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
        }

        let grid = Grid::new(width, height);
        let mut tiles = Vec::with_capacity(grid.len());
        // Text is top row first; storage is bottom row first.
        for cells in parsed.iter().rev() {
            for &(kind, power_up) in cells {
                tiles.push(Tile {
                    kind,
                    power_up,
                    index: tiles.len(),
                });
            }
        }
        Self::new(grid, tiles, Layout::default())
    }

    /// Parse a multi-line board string. See [`Board::from_rows`].
    pub fn parse(text: &str) -> Result<Self, BoardError> {
        let rows: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        Self::from_rows(&rows)
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.grid.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.grid.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn locations(&self) -> &[TileLocation] {
        &self.locations
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn check_index(&self, index: usize) -> Result<(), BoardError> {
        if self.grid.contains(index) {
            Ok(())
        } else {
            Err(BoardError::IndexOutOfRange {
                index,
                len: self.tiles.len(),
            })
        }
    }

    pub fn get(&self, index: usize) -> Result<&Tile, BoardError> {
        self.check_index(index)?;
        Ok(&self.tiles[index])
    }

    pub fn is_obstacle(&self, index: usize) -> Result<bool, BoardError> {
        self.get(index).map(Tile::is_obstacle)
    }

    pub fn location(&self, index: usize) -> Result<&TileLocation, BoardError> {
        self.check_index(index)?;
        Ok(&self.locations[index])
    }

    /// Where a refill tile waits before entering `column`: `offset` rows
    /// above the top cell of that column.
    pub fn staging_location(&self, column: usize, offset: usize) -> Location {
        self.layout
            .location(&self.grid, column, self.grid.height - 1 + offset)
    }

    /// Exchange the tiles at `i` and `j`, relabeling both.
    pub fn swap_occupants(&mut self, i: usize, j: usize) -> Result<(), BoardError> {
        self.check_index(i)?;
        self.check_index(j)?;
        self.tiles.swap(i, j);
        self.tiles[i].index = i;
        self.tiles[j].index = j;
        Ok(())
    }

    /// Mutable access for in-place recoloring of refill tiles.
    pub(crate) fn tile_mut(&mut self, index: usize) -> &mut Tile {
        &mut self.tiles[index]
    }

    /// Relocate every tile named in `moves` to its target in one step.
    ///
    /// # Panics
    /// The batch must be a permutation of the cells it touches: unique
    /// sources, unique targets, the same set of cells on both sides, and
    /// no obstacle on either side. Anything else is a cascade defect.
    pub fn apply_moves(&mut self, moves: &[MoveRequest]) {
        let len = self.tiles.len();
        let mut sources = vec![false; len];
        let mut targets = vec![false; len];
        let mut next = self.tiles.clone();

        for m in moves {
            assert!(!sources[m.tile_index], "tile {} moved twice", m.tile_index);
            assert!(!targets[m.target_index], "duplicate move target {}", m.target_index);
            sources[m.tile_index] = true;
            targets[m.target_index] = true;

            let mut tile = self.tiles[m.tile_index];
            assert!(!tile.is_obstacle(), "obstacle at {} cannot move", m.tile_index);
            assert!(
                !self.tiles[m.target_index].is_obstacle(),
                "move onto obstacle at {}",
                m.target_index
            );
            tile.index = m.target_index;
            next[m.target_index] = tile;
        }
        assert!(sources == targets, "move batch is not a permutation");

        self.tiles = next;
    }

    /// Verify `|tiles| == |locations| == width * height` and that every
    /// tile and location is labeled with the slot it lives in.
    pub fn check_invariants(&self) -> Result<(), BoardError> {
        let cells = self.grid.len();
        if self.tiles.len() != cells || self.locations.len() != cells {
            return Err(BoardError::LengthMismatch {
                tiles: self.tiles.len(),
                locations: self.locations.len(),
                cells,
            });
        }
        for (slot, tile) in self.tiles.iter().enumerate() {
            if tile.index != slot {
                return Err(BoardError::Misindexed {
                    slot,
                    index: tile.index,
                });
            }
        }
        for (slot, loc) in self.locations.iter().enumerate() {
            if loc.index != slot {
                return Err(BoardError::Misindexed {
                    slot,
                    index: loc.index,
                });
            }
        }
        Ok(())
    }
}

impl Index<usize> for Board {
    type Output = Tile;

    fn index(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }
}

fn parse_token(token: &str) -> Option<(TileKind, Option<PowerUp>)> {
    if token == "#" {
        return Some((TileKind::Obstacle, None));
    }
    let (digits, power_up) = match token.char_indices().last()? {
        (i, '-') => (&token[..i], Some(PowerUp::Line)),
        (i, '+') => (&token[..i], Some(PowerUp::Cross)),
        (i, '*') => (&token[..i], Some(PowerUp::ColorBomb)),
        _ => (token, None),
    };
    let color = digits.parse::<ColorId>().ok()?;
    Some((TileKind::Normal(color), power_up))
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TileKind::Obstacle => write!(f, "#"),
            TileKind::Normal(c) => {
                let suffix = match self.power_up {
                    None => "",
                    Some(PowerUp::Line) => "-",
                    Some(PowerUp::Cross) => "+",
                    Some(PowerUp::ColorBomb) => "*",
                };
                write!(f, "{c}{suffix}")
            }
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..self.grid.height).rev() {
            let row: Vec<String> = self
                .grid
                .row_indices(y)
                .map(|i| self.tiles[i].to_string())
                .collect();
            writeln!(f, "{}", row.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::Origin;

    fn sample() -> Board {
        Board::from_rows(&[
            "0 1 #", //
            "2 0+ 1",
        ])
        .unwrap()
    }

    #[test]
    fn test_from_rows_bottom_row_first_storage() {
        let board = sample();
        assert_eq!(board.width(), 3);
        assert_eq!(board.height(), 2);
        // Bottom row of the text lands at indices 0..3
        assert_eq!(board[0].color(), Some(2));
        assert_eq!(board[1].power_up, Some(PowerUp::Cross));
        assert!(board[5].is_obstacle());
        assert_eq!(board[3].color(), Some(0));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_display_roundtrip() {
        let board = sample();
        let text = board.to_string();
        assert_eq!(text, "0 1 #\n2 0+ 1\n");
        assert_eq!(Board::parse(&text).unwrap(), board);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Board::from_rows(&["0 1", "2"]),
            Err(BoardError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            Board::from_rows(&["0 x"]),
            Err(BoardError::InvalidToken { row: 0, .. })
        ));
        assert_eq!(Board::from_rows(&[]), Err(BoardError::Empty));
    }

    #[test]
    fn test_get_out_of_range() {
        let board = sample();
        assert_eq!(
            board.get(6),
            Err(BoardError::IndexOutOfRange { index: 6, len: 6 })
        );
        assert_eq!(board.is_obstacle(5), Ok(true));
        assert_eq!(board.is_obstacle(0), Ok(false));
    }

    #[test]
    fn test_swap_occupants_relabels() {
        let mut board = sample();
        board.swap_occupants(0, 3).unwrap();
        assert_eq!(board[0].color(), Some(0));
        assert_eq!(board[3].color(), Some(2));
        assert_eq!(board[0].index, 0);
        assert_eq!(board[3].index, 3);
        board.check_invariants().unwrap();

        assert!(board.swap_occupants(0, 9).is_err());
    }

    #[test]
    fn test_obstacles_never_match() {
        let a = Tile::obstacle(0);
        let b = Tile::obstacle(1);
        assert!(!a.matches(&b));
        assert!(Tile::normal(1, 0).matches(&Tile::normal(1, 5)));
        assert!(!Tile::normal(1, 0).matches(&a));
    }

    #[test]
    fn test_locations_centered() {
        let board = Board::from_rows(&["0 1", "1 0"]).unwrap();
        let loc = board.location(0).unwrap().location;
        assert_eq!(loc, Location { x: -0.5, y: -0.5 });
        let top_right = board.location(3).unwrap().location;
        assert_eq!(top_right, Location { x: 0.5, y: 0.5 });
        // One row above the top of column 1
        assert_eq!(board.staging_location(1, 1), Location { x: 0.5, y: 1.5 });
    }

    #[test]
    fn test_apply_moves_permutation() {
        // Column 0: 0 at bottom, 1 above it; rotate them
        let mut board = Board::from_rows(&["1 2", "0 3"]).unwrap();
        let moves = [
            MoveRequest {
                tile_index: 2,
                target_index: 0,
                origin: Origin::Board,
            },
            MoveRequest {
                tile_index: 0,
                target_index: 2,
                origin: Origin::AboveColumn { offset: 1 },
            },
        ];
        board.apply_moves(&moves);
        assert_eq!(board[0].color(), Some(1));
        assert_eq!(board[2].color(), Some(0));
        board.check_invariants().unwrap();
    }

    #[test]
    #[should_panic(expected = "duplicate move target")]
    fn test_apply_moves_duplicate_target_panics() {
        let mut board = Board::from_rows(&["1 2", "0 3"]).unwrap();
        let moves = [
            MoveRequest {
                tile_index: 2,
                target_index: 0,
                origin: Origin::Board,
            },
            MoveRequest {
                tile_index: 3,
                target_index: 0,
                origin: Origin::Board,
            },
        ];
        board.apply_moves(&moves);
    }
}
