//! Viewport sampling
//!
//! Converts the part of the canvas a session is looking at into a flat,
//! row-major string of glyphs. Cells past the grid edge render blank so
//! every row is exactly `width` glyphs long.

use std::collections::HashSet;

use crate::core::Canvas;

/// Luminosity ramp, darkest to brightest
pub const RAMP: [char; 7] = [' ', '.', '-', '+', '*', '#', '@'];

/// Glyph drawn where any session's cursor sits
pub const CURSOR_GLYPH: char = 'X';

/// Highest zoom level (each screen cell covers `zoom + 1` grid cells per side)
pub const MAX_ZOOM: u8 = 10;

/// The rectangle of the canvas a session renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Grid column of the top-left screen cell
    pub x: usize,
    /// Grid row of the top-left screen cell
    pub y: usize,
    /// Terminal columns
    pub width: usize,
    /// Terminal rows
    pub height: usize,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { x: 0, y: 0, width, height, zoom: 0 }
    }

    /// Grid cells per screen cell along each axis
    pub fn scale(&self) -> usize {
        self.zoom as usize + 1
    }

    /// Grid position under a viewport-relative screen position, clamped to the grid
    pub fn to_grid(&self, col: i32, row: i32, grid_size: usize) -> (usize, usize) {
        let last = grid_size.saturating_sub(1);
        let map = |origin: usize, offset: i32| {
            let offset = offset.max(0) as usize;
            origin.saturating_add(offset.saturating_mul(self.scale())).min(last)
        };
        (map(self.x, col), map(self.y, row))
    }
}

/// One rendered viewport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    glyphs: String,
}

impl Frame {
    /// Build a frame from ASCII glyphs. `glyphs` must hold `width * height` characters.
    pub fn from_glyphs(width: usize, height: usize, glyphs: String) -> Self {
        debug_assert_eq!(glyphs.len(), width * height);
        debug_assert!(glyphs.is_ascii());
        Self { width, height, glyphs }
    }

    pub fn as_str(&self) -> &str {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn same_dimensions(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// The `width`-sized rows of the frame
    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        let width = self.width;
        (0..self.height).map(move |row| &self.glyphs[row * width..(row + 1) * width])
    }
}

/// Glyph for a luminosity level
pub fn glyph_for(level: u8) -> char {
    RAMP[(level as usize).min(RAMP.len() - 1)]
}

/// Sample the canvas under a viewport. `cursors` holds the grid positions
/// of every session's cursor.
pub fn render_viewport(canvas: &Canvas, view: &Viewport, cursors: &HashSet<(usize, usize)>) -> Frame {
    let size = canvas.size();
    let scale = view.scale();
    let mut glyphs = String::with_capacity(view.width * view.height);

    for row in 0..view.height {
        let gy = view.y.saturating_add(row.saturating_mul(scale));
        for col in 0..view.width {
            let gx = view.x.saturating_add(col.saturating_mul(scale));
            if gx >= size || gy >= size {
                glyphs.push(' ');
                continue;
            }

            let has_cursor = if scale == 1 {
                cursors.contains(&(gx, gy))
            } else {
                cursors
                    .iter()
                    .any(|&(cx, cy)| (gx..gx + scale).contains(&cx) && (gy..gy + scale).contains(&cy))
            };

            if has_cursor {
                glyphs.push(CURSOR_GLYPH);
            } else {
                glyphs.push(glyph_for(canvas.block_max(gy, gx, scale)));
            }
        }
    }

    Frame::from_glyphs(view.width, view.height, glyphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame() {
        let canvas = Canvas::with_size(16);
        let frame = render_viewport(&canvas, &Viewport::new(4, 3), &HashSet::new());
        assert_eq!(frame.len(), 12);
        assert_eq!(frame.as_str(), "            ");
    }

    #[test]
    fn test_ramp_and_cursor() {
        let mut canvas = Canvas::with_size(16);
        for level in 0..7u8 {
            canvas.set(0, level as usize, level);
        }
        let mut cursors = HashSet::new();
        cursors.insert((1, 1));

        let frame = render_viewport(&canvas, &Viewport::new(7, 2), &cursors);
        let lines: Vec<&str> = frame.lines().collect();
        assert_eq!(lines, vec![" .-+*#@", " X     "]);
    }

    #[test]
    fn test_viewport_offset() {
        let mut canvas = Canvas::with_size(16);
        canvas.set(5, 10, 6);
        let view = Viewport { x: 9, y: 4, width: 3, height: 2, zoom: 0 };
        let frame = render_viewport(&canvas, &view, &HashSet::new());
        assert_eq!(frame.lines().collect::<Vec<_>>(), vec!["   ", " @ "]);
    }

    #[test]
    fn test_clips_at_grid_edge() {
        let mut canvas = Canvas::with_size(8);
        canvas.set(7, 7, 6);
        let view = Viewport { x: 6, y: 6, width: 4, height: 3, zoom: 0 };
        let frame = render_viewport(&canvas, &view, &HashSet::new());
        // Rows stay aligned even though only 2x2 cells are on the grid
        assert_eq!(frame.len(), 12);
        assert_eq!(frame.lines().collect::<Vec<_>>(), vec!["    ", " @  ", "    "]);
    }

    #[test]
    fn test_origin_past_grid() {
        let canvas = Canvas::with_size(8);
        let view = Viewport { x: 8, y: 0, width: 2, height: 2, zoom: 0 };
        let frame = render_viewport(&canvas, &view, &HashSet::new());
        assert_eq!(frame.as_str(), "    ");
    }

    #[test]
    fn test_zoomed_out_shows_brightest() {
        let mut canvas = Canvas::with_size(16);
        canvas.set(1, 1, 2);
        canvas.set(2, 3, 4);
        let mut cursors = HashSet::new();
        cursors.insert((5, 1));

        let view = Viewport { x: 0, y: 0, width: 3, height: 2, zoom: 1 };
        let frame = render_viewport(&canvas, &view, &cursors);
        assert_eq!(frame.lines().collect::<Vec<_>>(), vec!["- X", " * "]);
    }

    #[test]
    fn test_to_grid() {
        let view = Viewport { x: 10, y: 20, width: 80, height: 24, zoom: 0 };
        assert_eq!(view.to_grid(0, 0, 1024), (10, 20));
        assert_eq!(view.to_grid(-5, 3, 1024), (10, 23));
        assert_eq!(view.to_grid(5000, 5000, 1024), (1023, 1023));

        let zoomed = Viewport { zoom: 2, ..view };
        assert_eq!(zoomed.to_grid(2, 1, 1024), (16, 23));
    }

    #[test]
    fn test_lines_of_empty_frame() {
        let frame = Frame::from_glyphs(0, 0, String::new());
        assert_eq!(frame.lines().count(), 0);
        assert!(frame.is_empty());
    }
}
