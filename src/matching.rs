//! Match detection.
//!
//! Starting from a seed cell, walk outward in each of the four directions
//! while the neighbouring tile has the seed's color. Runs on the vertical
//! axis (up + down + seed) and the horizontal axis (left + right + seed)
//! are counted separately; an axis whose run reaches [`MATCH`] contributes
//! its cells to the result. Obstacles never match, so they end a walk.

use std::collections::BTreeSet;

use crate::board::Board;
use crate::constants::MATCH;
use crate::grid::Direction;

/// Unique indices produced by one detection pass.
pub type MatchSet = BTreeSet<usize>;

/// Indices reached by walking from `seed` in `direction` over tiles that
/// match the seed, nearest first. The seed itself is not included.
pub fn walk(board: &Board, seed: usize, direction: Direction) -> Vec<usize> {
    let grid = board.grid();
    let origin = &board[seed];
    let mut run = Vec::new();
    let mut current = seed;
    while let Some(next) = grid.step(direction, current) {
        if !board[next].matches(origin) {
            break;
        }
        run.push(next);
        current = next;
    }
    run
}

/// Find the match through `seed`, if any.
///
/// Returns the union of every axis whose run is at least [`MATCH`] long.
/// An obstacle seed never matches.
pub fn find_matches(board: &Board, seed: usize) -> Option<MatchSet> {
    if board[seed].is_obstacle() {
        return None;
    }

    let mut vertical = vec![seed];
    let mut horizontal = vec![seed];
    for direction in Direction::ALL {
        let run = walk(board, seed, direction);
        if direction.is_vertical() {
            vertical.extend(run);
        } else {
            horizontal.extend(run);
        }
    }

    let mut matched = MatchSet::new();
    if vertical.len() >= MATCH {
        matched.extend(vertical);
    }
    if horizontal.len() >= MATCH {
        matched.extend(horizontal);
    }
    if matched.is_empty() { None } else { Some(matched) }
}

/// Union of the matches through every seed.
pub fn find_matches_at<I>(board: &Board, seeds: I) -> MatchSet
where
    I: IntoIterator<Item = usize>,
{
    let mut matched = MatchSet::new();
    for seed in seeds {
        if let Some(found) = find_matches(board, seed) {
            matched.extend(found);
        }
    }
    matched
}

/// Every match currently on the board.
pub fn find_all_matches(board: &Board) -> MatchSet {
    find_matches_at(board, 0..board.len())
}
