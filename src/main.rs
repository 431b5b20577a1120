//! Telnet Canvas Server Binary
//!
//! Run with: cargo run -- [options]
//!
//! Every option can also come from the environment:
//!   PORT            Listen port (default: 23)
//!   BIND            Listen address (default: 0.0.0.0)
//!   TIMEOUT         Inactivity timeout in ms (default: 10000)
//!   MAX_USERS       Concurrent session limit (default: 100)
//!   FRAME_INTERVAL  Minimum ms between renders per session (default: 100)

use clap::Parser;
use log::info;

use telnet_canvas::{Config, Server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    info!("Telnet Canvas v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {} (timeout {}ms, max {} users)", config.listen_addr(), config.timeout_ms, config.max_users);

    Server::new(config).run().await?;

    Ok(())
}
