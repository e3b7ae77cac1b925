use thiserror::Error;

/// Top-level error type for wikipeek.
#[derive(Debug, Error)]
pub enum WikipeekError {
    /// Error from the inbound message channel (gateway transport).
    #[error("channel error: {0}")]
    Channel(String),

    /// Error from a chat-platform API call (send/edit/delete/fetch).
    #[error("chat api error: {0}")]
    Chat(String),

    /// Error from the headless rendering session.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
