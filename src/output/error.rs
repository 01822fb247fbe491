//! Output-specific error types.

use thiserror::Error;

/// Errors raised while handing protocol text to the writer thread.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The writer thread has stopped, usually because the sink broke.
    #[error("output writer is closed")]
    ChannelClosed,

    /// Writing to or flushing the sink failed.
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),
}
