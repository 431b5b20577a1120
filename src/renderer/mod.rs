//! Canvas Renderer Module
//!
//! Renderers turn a session's view of the canvas into terminal output.
//! - frame: viewport sampling into a flat glyph frame
//! - screen: frame-to-frame differencing into escape sequences
//! - scheduler: per-session render rate limiting

pub mod frame;
pub mod scheduler;
pub mod screen;

pub use frame::{render_viewport, Frame, Viewport, CURSOR_GLYPH, RAMP};
pub use scheduler::{RenderDecision, RenderScheduler};
pub use screen::{render_screen, STATUS_LINE};

/// ANSI escape sequences
pub const CSI: &str = "\x1b[";

/// Button, any-motion and decimal-coordinate mouse reporting
pub const ENABLE_MOUSE: &str = "\x1b[?1000h\x1b[?1003h\x1b[?1015h";

/// Turn every mouse mode back off
pub const DISABLE_MOUSE: &str = "\x1b[?1000l\x1b[?1003l\x1b[?1015l";

pub const CURSOR_HOME: &str = "\x1b[H";
pub const HIDE_CURSOR: &str = "\x1b[?25l";
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Move the terminal cursor to the start of a 0-based row
pub fn move_to_row(row: usize) -> String {
    format!("{}{};1H", CSI, row + 1)
}

/// Bytes sent when a session ends: restore the terminal and say goodbye
pub fn disconnect_sequence(message: &str) -> String {
    format!("{}{}{}\r\n{}", DISABLE_MOUSE, CURSOR_HOME, message, SHOW_CURSOR)
}
