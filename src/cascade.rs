//! Gravity and refill.
//!
//! Cleared cells are handled column by column. Above the lowest cleared
//! cell of a column, every surviving tile falls into the lowest free slot
//! below it, passing over obstacle cells (which never move). The cleared
//! tiles themselves are recycled: each gets a fresh color and power-up and
//! drops in from above the column into the remaining slots at the top.
//!
//! The result is a batch of [`MoveRequest`]s that is a permutation of the
//! non-obstacle cells at or above each column's lowest gap; it is applied
//! in one step by [`Board::apply_moves`].

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use thiserror::Error;

use crate::board::Board;
use crate::generator::TileFactory;
use crate::grid::{Direction, Grid};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CascadeError {
    #[error("column {column} has no free slot for the tile from index {tile_index}")]
    NoFreeSlot { column: usize, tile_index: usize },
    #[error("cleared index {0} is an obstacle")]
    ObstacleCleared(usize),
    #[error("cleared index {index} is out of range for a board of {len} cells")]
    OutOfRange { index: usize, len: usize },
}

/// Where a moving tile starts from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Falling from its current cell.
    Board,
    /// A refill entering `offset` rows above the top of its column.
    AboveColumn { offset: usize },
}

/// One tile relocation: the tile currently at `tile_index` ends up at
/// `target_index`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MoveRequest {
    pub tile_index: usize,
    pub target_index: usize,
    pub origin: Origin,
}

impl MoveRequest {
    pub fn is_refill(&self) -> bool {
        matches!(self.origin, Origin::AboveColumn { .. })
    }
}

/// Group cleared indices by column; each list is sorted bottom to top.
fn partition_by_column(grid: &Grid, cleared: &BTreeSet<usize>) -> BTreeMap<usize, Vec<usize>> {
    let mut columns: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &index in cleared {
        columns.entry(grid.column(index)).or_default().push(index);
    }
    columns
}

/// Starting at `candidate`, climb one row at a time until the cell is
/// neither an obstacle nor already claimed. Fails at the top of the board.
fn settle_target(
    board: &Board,
    candidate: usize,
    claimed: &[usize],
    tile_index: usize,
) -> Result<usize, CascadeError> {
    let grid = board.grid();
    let mut target = candidate;
    while board[target].is_obstacle() || claimed.contains(&target) {
        target = grid
            .step(Direction::Up, target)
            .ok_or(CascadeError::NoFreeSlot {
                column: grid.column(candidate),
                tile_index,
            })?;
    }
    Ok(target)
}

/// Plan the moves for one column. `vacated` is sorted bottom to top.
fn plan_column(
    board: &Board,
    column: usize,
    vacated: &[usize],
    moves: &mut Vec<MoveRequest>,
) -> Result<(), CascadeError> {
    let grid = board.grid();
    let width = grid.width;
    let lowest = vacated[0];
    let mut claimed: Vec<usize> = Vec::with_capacity(grid.height);

    // Survivors above the lowest gap, bottom to top.
    let falling: Vec<usize> = grid
        .column_indices(column)
        .filter(|&i| i > lowest && !board[i].is_obstacle() && !vacated.contains(&i))
        .collect();

    for &tile_index in &falling {
        // Every vacated or obstacle cell between the gap and this tile is
        // a row the tile can drop past.
        let skipped = (grid.row(lowest)..grid.row(tile_index))
            .map(|y| grid.coord_to_index(column, y))
            .filter(|&i| board[i].is_obstacle() || vacated.contains(&i))
            .count();
        let candidate = tile_index - skipped * width;
        let target = settle_target(board, candidate, &claimed, tile_index)?;
        claimed.push(target);
        if target != tile_index {
            moves.push(MoveRequest {
                tile_index,
                target_index: target,
                origin: Origin::Board,
            });
        }
    }

    // Refills take the remaining slots, the first one entering closest to
    // the board landing lowest.
    for (n, &tile_index) in vacated.iter().enumerate() {
        let target = settle_target(board, lowest, &claimed, tile_index)?;
        claimed.push(target);
        moves.push(MoveRequest {
            tile_index,
            target_index: target,
            origin: Origin::AboveColumn { offset: n + 1 },
        });
    }

    debug!(
        "column {column}: {} vacated, {} falling",
        vacated.len(),
        falling.len()
    );
    Ok(())
}

/// Plan gravity and refills for `cleared`, recolor the recycled tiles, and
/// return the move batch. The board's tile positions are not changed;
/// apply the batch with [`Board::apply_moves`].
///
/// Fails without touching the board if a cleared index is an obstacle or
/// out of range, or if a column runs out of free slots.
pub fn cascade(
    board: &mut Board,
    cleared: &BTreeSet<usize>,
    factory: &mut TileFactory,
) -> Result<Vec<MoveRequest>, CascadeError> {
    for &index in cleared {
        match board.get(index) {
            Err(_) => {
                return Err(CascadeError::OutOfRange {
                    index,
                    len: board.len(),
                });
            }
            Ok(tile) if tile.is_obstacle() => return Err(CascadeError::ObstacleCleared(index)),
            Ok(_) => {}
        }
    }

    let mut moves = Vec::new();
    for (column, vacated) in partition_by_column(board.grid(), cleared) {
        plan_column(board, column, &vacated, &mut moves)?;
    }

    for m in moves.iter().filter(|m| m.is_refill()) {
        factory.recolor(board.tile_mut(m.tile_index));
    }
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::powerup::{PowerupProfile, PowerupTable};

    fn factory() -> TileFactory {
        let table = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
        TileFactory::new(4, table, Some(99))
    }

    fn set(indices: &[usize]) -> BTreeSet<usize> {
        indices.iter().copied().collect()
    }

    fn targets(moves: &[MoveRequest]) -> Vec<(usize, usize)> {
        moves.iter().map(|m| (m.tile_index, m.target_index)).collect()
    }

    #[test]
    fn test_single_column_drop() {
        // Column 0, bottom to top: 0, 1, 2, 3 at indices 0, 2, 4, 6
        let mut board = Board::from_rows(&["3 9", "2 9", "1 9", "0 9"]).unwrap();
        let moves = cascade(&mut board, &set(&[2]), &mut factory()).unwrap();
        assert_eq!(targets(&moves), vec![(4, 2), (6, 4), (2, 6)]);
        assert_eq!(moves[2].origin, Origin::AboveColumn { offset: 1 });

        board.apply_moves(&moves);
        assert_eq!(board[0].color(), Some(0));
        assert_eq!(board[2].color(), Some(2));
        assert_eq!(board[4].color(), Some(3));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_horizontal_clear_spans_columns() {
        let mut board = Board::from_rows(&[
            "5 6 7", //
            "0 0 0",
        ])
        .unwrap();
        let moves = cascade(&mut board, &set(&[0, 1, 2]), &mut factory()).unwrap();
        let falls: Vec<_> = moves.iter().filter(|m| !m.is_refill()).copied().collect();
        assert_eq!(targets(&falls), vec![(3, 0), (4, 1), (5, 2)]);
        let refills: Vec<_> = moves.iter().filter(|m| m.is_refill()).copied().collect();
        assert_eq!(targets(&refills), vec![(0, 3), (1, 4), (2, 5)]);

        board.apply_moves(&moves);
        assert_eq!(board[0].color(), Some(5));
        assert_eq!(board[1].color(), Some(6));
        assert_eq!(board[2].color(), Some(7));
    }

    #[test]
    fn test_falls_past_obstacle() {
        // Column 0 bottom to top: a(0), cleared(1), #(2), c(3)
        let mut board = Board::from_rows(&["3 9", "# 9", "1 9", "0 9"]).unwrap();
        let moves = cascade(&mut board, &set(&[2]), &mut factory()).unwrap();
        assert_eq!(targets(&moves), vec![(6, 2), (2, 6)]);

        board.apply_moves(&moves);
        assert!(board[4].is_obstacle());
        assert_eq!(board[4].index, 4);
        assert_eq!(board[2].color(), Some(3));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_vertical_clear_under_obstacle() {
        // Column 0 bottom to top: cleared x3 (0, 2, 4), #(6), 7(8), 8(10)
        let mut board =
            Board::from_rows(&["8 9", "7 9", "# 9", "1 9", "1 9", "1 9"]).unwrap();
        let moves = cascade(&mut board, &set(&[0, 2, 4]), &mut factory()).unwrap();
        let falls: Vec<_> = moves.iter().filter(|m| !m.is_refill()).copied().collect();
        assert_eq!(targets(&falls), vec![(8, 0), (10, 2)]);
        let refills: Vec<_> = moves.iter().filter(|m| m.is_refill()).copied().collect();
        assert_eq!(targets(&refills), vec![(0, 4), (2, 8), (4, 10)]);

        board.apply_moves(&moves);
        assert!(board[6].is_obstacle());
        assert_eq!(board[0].color(), Some(7));
        assert_eq!(board[2].color(), Some(8));
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_tile_below_gap_untouched() {
        let mut board = Board::from_rows(&["2 9", "1 9", "0 9"]).unwrap();
        let before = board[0];
        let moves = cascade(&mut board, &set(&[4]), &mut factory()).unwrap();
        // Top cell cleared: nothing falls, one refill in place
        assert_eq!(targets(&moves), vec![(4, 4)]);
        board.apply_moves(&moves);
        assert_eq!(board[0], before);
    }

    #[test]
    fn test_targets_unique_and_not_obstacles() {
        let mut board = Board::from_rows(&[
            "0 1 2 3", //
            "1 # 3 0",
            "2 3 # 1",
            "3 0 1 #",
            "0 1 2 3",
        ])
        .unwrap();
        let cleared = set(&[0, 1, 2, 4, 5, 9]);
        let moves = cascade(&mut board, &cleared, &mut factory()).unwrap();
        let mut seen = BTreeSet::new();
        for m in &moves {
            assert!(seen.insert(m.target_index), "duplicate target {}", m.target_index);
            assert!(!board[m.target_index].is_obstacle());
        }
        let obstacles: Vec<usize> = (0..board.len()).filter(|&i| board[i].is_obstacle()).collect();
        board.apply_moves(&moves);
        for i in obstacles {
            assert!(board[i].is_obstacle());
        }
        board.check_invariants().unwrap();
    }

    #[test]
    fn test_obstacle_in_cleared_set_is_rejected() {
        let mut board = Board::from_rows(&["# 1", "0 1"]).unwrap();
        assert_eq!(
            cascade(&mut board, &set(&[2]), &mut factory()),
            Err(CascadeError::ObstacleCleared(2))
        );
        assert!(matches!(
            cascade(&mut board, &set(&[7]), &mut factory()),
            Err(CascadeError::OutOfRange { index: 7, .. })
        ));
    }

    #[test]
    fn test_refill_recolors_with_factory() {
        let table = PowerupTable::new(&PowerupProfile {
            chance: 1.0,
            ..PowerupProfile::default()
        })
        .unwrap();
        let mut factory = TileFactory::new(3, table, Some(5));
        let mut board = Board::from_rows(&["7 7", "7 7"]).unwrap();
        let moves = cascade(&mut board, &set(&[0]), &mut factory).unwrap();
        board.apply_moves(&moves);
        // Index 2 fell to 0; the recycled tile sits on top with a new color
        assert_eq!(board[0].color(), Some(7));
        assert!(board[2].color().unwrap() < 3);
        assert!(board[2].power_up.is_some());
    }
}
