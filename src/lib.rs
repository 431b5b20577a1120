//! Telnet Canvas
//!
//! A shared drawing surface served over telnet. Every connected client
//! looks at its own viewport onto one grid and paints on it with the mouse.
//!
//! # Overview
//!
//! Telnet Canvas provides:
//! - Telnet option negotiation and window size tracking
//! - Mouse and keyboard decoding from raw terminal bytes
//! - A shared canvas of luminosity levels
//! - Per-session viewports rendered by frame differencing
//! - A tokio TCP server with capacity and inactivity limits
//!
//! # Example
//!
//! ```no_run
//! use telnet_canvas::{Config, Server};
//!
//! # async fn run() -> Result<(), telnet_canvas::ServerError> {
//! let config = Config { port: 2323, ..Config::default() };
//! Server::new(config).run().await
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod hub;
pub mod input;
pub mod registry;
pub mod renderer;
pub mod server;
pub mod session;
pub mod telnet;

// Re-export commonly used types
pub use config::Config;
pub use crate::core::{Canvas, GRID_SIZE, LUMINOSITY_LEVELS};
pub use error::ServerError;
pub use hub::{Hub, SharedHub};
pub use input::{InputEvent, KeyEvent, MouseEvent, MouseKind};
pub use renderer::{Frame, RenderScheduler, Viewport};
pub use server::Server;
pub use session::{Session, SessionEvent, SessionId};
pub use telnet::{TelnetCommand, TelnetDecoder};
