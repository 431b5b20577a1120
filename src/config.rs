//! Canvas Server Configuration
//!
//! Every setting can be given as a command line flag or through the
//! environment. Defaults match a stock telnet deployment.

use std::time::Duration;

use clap::Parser;

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Shared ASCII canvas served over telnet", long_about = None)]
pub struct Config {
    /// Port to accept telnet clients on
    #[arg(short = 'p', long, env = "PORT", default_value_t = 23)]
    pub port: u16,

    /// Address to bind the listener to
    #[arg(short = 'b', long, env = "BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Inactivity timeout in milliseconds
    #[arg(short = 't', long = "timeout", env = "TIMEOUT", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Maximum number of concurrent sessions
    #[arg(short = 'm', long, env = "MAX_USERS", default_value_t = 100)]
    pub max_users: usize,

    /// Minimum milliseconds between two renders of the same session
    #[arg(long = "frame-interval", env = "FRAME_INTERVAL", default_value_t = 100)]
    pub frame_interval_ms: u64,
}

impl Config {
    /// Socket address string for the listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 23,
            bind: "0.0.0.0".to_string(),
            timeout_ms: 10_000,
            max_users: 100,
            frame_interval_ms: 100,
        }
    }
}
