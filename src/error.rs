//! Error types for the avatar speech and animation core.

/// Top-level error type for speech synthesis and facial animation.
#[derive(Debug, thiserror::Error)]
pub enum VisageError {
    /// A required capability was never configured, or a config value is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Text-to-speech synthesis error (service failure or empty payload).
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio duration could not be measured.
    #[error("duration error: {0}")]
    Duration(String),

    /// Persisted audio could not be written or located.
    #[error("storage error: {0}")]
    Storage(String),

    /// A bounded external call ran past its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Interview session lookup error.
    #[error("session error: {0}")]
    Session(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VisageError>;
