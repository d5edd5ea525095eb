//! Tilecascade: the simulation core of a tile-matching puzzle.
//!
//! Given a rectangular grid of colored tiles, obstacles, and power-ups,
//! this crate validates swap requests, detects matches, fires power-ups,
//! drops tiles around fixed obstacles, refills from the top, and repeats
//! until the board settles. Rendering and animation are left to the
//! caller, which consumes the [`engine::Event`]s produced at each step.
//!
//! ## Modules
//!
//! - [`constants`] - Match threshold and defaults
//! - [`grid`] - Index/coordinate arithmetic and edge legality
//! - [`board`] - Tiles, board state, and world locations
//! - [`matching`] - Match detection
//! - [`powerup`] - Power-up rolls and clear-set expansion
//! - [`cascade`] - Gravity and refill planning
//! - [`generator`] - Initial board generation and the tile factory
//! - [`engine`] - Swaps, the stabilization loop, and events
//! - [`config`] - Board configuration
//! - [`protocol`] - Line-oriented text protocol
//!
//! ## Example
//!
//! ```
//! use tilecascade::board::Board;
//! use tilecascade::engine::{Engine, Event};
//! use tilecascade::generator::TileFactory;
//! use tilecascade::powerup::{PowerupProfile, PowerupTable};
//!
//! // Text rows are top row first; index 0 is the bottom-left cell.
//! let board = Board::from_rows(&["1 2 1", "0 0 1", "2 1 0"]).unwrap();
//! let table = PowerupTable::new(&PowerupProfile::disabled()).unwrap();
//! let mut engine = Engine::with_board(board, TileFactory::new(3, table, Some(7)));
//!
//! let events = engine.swap(2, 5).unwrap();
//! assert!(matches!(events[0], Event::TilesCleared { .. }));
//! assert_eq!(events.last(), Some(&Event::BoardSettled));
//! ```

pub mod board;
pub mod cascade;
pub mod config;
pub mod constants;
pub mod engine;
pub mod generator;
pub mod grid;
pub mod matching;
pub mod powerup;
pub mod protocol;
