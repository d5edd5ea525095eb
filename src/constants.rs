//! Constants for match rules, default board dimensions, and generation.
//!
//! Everything here is a default or a fixed rule of the simulation. Runtime
//! board dimensions live on [`crate::grid::Grid`]; these values only seed
//! [`crate::config::BoardConfig`] when nothing else is given.

// =============================================================================
// Match Rules
// =============================================================================

/// Minimum run length (in one axis) that counts as a match.
pub const MATCH: usize = 3;

/// Minimum number of colors a generated board may use.
///
/// With fewer than three colors the generator cannot always avoid
/// pre-existing matches.
pub const MIN_COLORS: u8 = 3;

/// Upper bound on colors; one byte per color id.
pub const MAX_COLORS: u8 = 32;

// =============================================================================
// Default Board Geometry
// =============================================================================

/// Default board width (columns).
pub const DEFAULT_WIDTH: usize = 8;

/// Default board height (rows).
pub const DEFAULT_HEIGHT: usize = 8;

/// Largest accepted board width or height.
pub const MAX_DIMENSION: usize = 1024;

/// Default number of tile colors.
pub const DEFAULT_COLORS: u8 = 5;

/// Default distance between neighbouring cell centers in world units.
pub const DEFAULT_SPACING: f32 = 1.0;

// =============================================================================
// Power-Up Defaults
// =============================================================================

/// Probability that a freshly colored tile carries a power-up.
pub const DEFAULT_POWERUP_CHANCE: f32 = 0.025;

/// Relative probability of a Line power-up once a power-up is rolled.
pub const DEFAULT_LINE_PROBABILITY: f32 = 0.5;

/// Relative probability of a Cross power-up once a power-up is rolled.
pub const DEFAULT_CROSS_PROBABILITY: f32 = 0.3;

/// Relative probability of a ColorBomb power-up once a power-up is rolled.
pub const DEFAULT_COLOR_BOMB_PROBABILITY: f32 = 0.2;

// =============================================================================
// Stabilization
// =============================================================================

/// Maximum number of cascade passes in a single resolution chain.
///
/// Natural chains end far sooner; hitting this means the board can never
/// settle (e.g. a configuration that keeps regenerating matches).
pub const MAX_CASCADE_PASSES: usize = 256;
