//! Canvas Core Module
//!
//! Core data structures shared by every session:
//! - Canvas: the grid of luminosity levels

pub mod canvas;

pub use canvas::{Canvas, GRID_SIZE, LUMINOSITY_LEVELS, MAX_LEVEL};
