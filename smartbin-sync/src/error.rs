//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (connect, read, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error (frame violates the wire contract).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Frame exceeds the configured size limit.
    #[error("frame too large: {size} bytes (limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    /// No credential was available at startup.
    #[error("no access token available")]
    MissingCredential,

    /// Invalid endpoint URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The session is already running.
    #[error("session already started")]
    AlreadyStarted,

    /// Handshake did not complete in time.
    #[error("handshake timed out")]
    Timeout,

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
