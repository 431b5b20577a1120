//! Server errors
//!
//! Protocol decoding never produces errors; only socket-level failures do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other socket failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
