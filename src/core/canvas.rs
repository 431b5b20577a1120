//! Canvas - The shared drawing surface
//!
//! A square grid of luminosity levels. Every write goes through a
//! clamping setter so a cell can never hold an out-of-range level.

/// Side length of the shared grid
pub const GRID_SIZE: usize = 1024;

/// Number of distinct luminosity levels (0 = blank)
pub const LUMINOSITY_LEVELS: u8 = 7;

/// Highest valid luminosity level
pub const MAX_LEVEL: u8 = LUMINOSITY_LEVELS - 1;

/// The shared grid (row-major)
pub struct Canvas {
    size: usize,
    cells: Vec<u8>,
}

impl Canvas {
    /// Create a blank canvas of the standard size
    pub fn new() -> Self {
        Self::with_size(GRID_SIZE)
    }

    /// Create a blank square canvas with the given side length
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Side length of the grid
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn index(&self, y: usize, x: usize) -> Option<usize> {
        if x < self.size && y < self.size {
            Some(y * self.size + x)
        } else {
            None
        }
    }

    /// Level at a cell. Cells outside the grid read as blank.
    pub fn get(&self, y: usize, x: usize) -> u8 {
        self.index(y, x).map(|i| self.cells[i]).unwrap_or(0)
    }

    /// Store a level, clamped to the valid range. Writes outside the grid are dropped.
    pub fn set(&mut self, y: usize, x: usize, level: u8) {
        if let Some(i) = self.index(y, x) {
            self.cells[i] = level.min(MAX_LEVEL);
        }
    }

    /// Brighten (positive delta) or darken a cell, saturating at both ends.
    /// Returns the new level.
    pub fn adjust(&mut self, y: usize, x: usize, delta: i8) -> u8 {
        let current = self.get(y, x) as i16;
        let level = (current + delta as i16).clamp(0, MAX_LEVEL as i16) as u8;
        self.set(y, x, level);
        level
    }

    /// Brightest level inside a square block, clipped to the grid
    pub fn block_max(&self, y: usize, x: usize, side: usize) -> u8 {
        let y_end = (y + side).min(self.size);
        let x_end = (x + side).min(self.size);
        let mut max = 0;
        for row in y..y_end {
            for col in x..x_end {
                max = max.max(self.cells[row * self.size + col]);
                if max == MAX_LEVEL {
                    return max;
                }
            }
        }
        max
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}
