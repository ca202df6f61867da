//! Error types for the embedding backend.

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Failures surfaced by an embedding provider.
///
/// Batch-level failures are reported to the caller and logged there; the core
/// performs no per-chunk retry.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The provider configuration is unusable.
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// Transport-level failure talking to the backend.
    #[error("embedding request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status.
    #[error("embedding backend returned status {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend returned a different number of vectors than inputs.
    #[error("embedding count mismatch: expected {expected}, got {got}")]
    CountMismatch { expected: usize, got: usize },

    /// The backend returned vectors of unequal dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl EmbedError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
