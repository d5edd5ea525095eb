//! Grid coordinate system.
//!
//! The board is a row-major array: `index = x + y * width`. Row `y = 0` is
//! the bottom of the board, so [`Direction::Up`] moves towards larger
//! indices and gravity pulls tiles towards smaller ones.
//!
//! All functions are total for indices in `[0, len)`. Callers check
//! [`Grid::legal_move`] before stepping; [`Grid::step`] does both at once.

/// One of the four orthogonal directions on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, vertical axis first.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// True for `Up` and `Down`.
    #[inline]
    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Board dimensions and the index arithmetic built on them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of cells (`width * height`).
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    #[inline]
    pub fn coord_to_index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    #[inline]
    pub fn index_to_coord(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    #[inline]
    pub fn column(&self, index: usize) -> usize {
        index % self.width
    }

    #[inline]
    pub fn row(&self, index: usize) -> usize {
        index / self.width
    }

    /// Whether one step from `index` in `direction` stays on the board.
    ///
    /// Horizontal steps never wrap from one row into the next.
    pub fn legal_move(&self, direction: Direction, index: usize) -> bool {
        match direction {
            Direction::Up => index + self.width < self.len(),
            Direction::Down => index >= self.width,
            Direction::Left => index % self.width != 0,
            Direction::Right => index % self.width != self.width - 1,
        }
    }

    /// Signed index offset of one step in `direction`.
    #[inline]
    pub fn direction_delta(&self, direction: Direction) -> isize {
        match direction {
            Direction::Up => self.width as isize,
            Direction::Down => -(self.width as isize),
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }

    /// The neighbouring index in `direction`, or `None` at the board edge.
    #[inline]
    pub fn step(&self, direction: Direction, index: usize) -> Option<usize> {
        if self.legal_move(direction, index) {
            Some((index as isize + self.direction_delta(direction)) as usize)
        } else {
            None
        }
    }

    /// True if `a` and `b` are exactly one legal step apart.
    pub fn adjacent(&self, a: usize, b: usize) -> bool {
        Direction::ALL
            .iter()
            .any(|&d| self.step(d, a) == Some(b))
    }

    /// Every index of row `y`, left to right.
    pub fn row_indices(&self, y: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.width).map(move |x| self.coord_to_index(x, y))
    }

    /// Every index of column `x`, bottom to top.
    pub fn column_indices(&self, x: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.height).map(move |y| self.coord_to_index(x, y))
    }
}
