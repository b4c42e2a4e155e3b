//! Error types for the placement analyzer

/// Result type for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors surfaced by the analyzer core
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("Record for {record_key} filed under owner key {key}")]
    OwnerKeyMismatch { key: String, record_key: String },

    #[error("Invalid owner key {0:?}, expected namespace/kind/name")]
    InvalidOwnerKey(String),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// True for errors caused by caller-provided data
    pub fn is_input_error(&self) -> bool {
        !matches!(self, AnalyzerError::Encode(_) | AnalyzerError::Io(_))
    }
}
