// error.rs - Error taxonomy
//
// ViewerError is what the session sees. ParseError stays inside the loaders
// and is folded into ViewerError::LoadFailure at the engine boundary.

/// Errors surfaced by the classifier, engine and session.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("Unsupported file format: {filename}")]
    UnsupportedFormat { filename: String },

    #[error("Failed to load model: {0}")]
    LoadFailure(String),

    #[error("Failed to create graphics context: {0}")]
    ContextCreation(String),

    /// A completion for a load that was superseded or outlived its engine.
    #[error("Discarded stale load (generation {generation})")]
    StaleLoad { generation: u64 },

    #[error("Invalid operation '{op}' in state {state}")]
    InvalidState { op: &'static str, state: &'static str },
}

impl ViewerError {
    /// Whether the user should see this error as a notice.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, ViewerError::StaleLoad { .. })
    }
}

impl From<ParseError> for ViewerError {
    fn from(e: ParseError) -> Self {
        ViewerError::LoadFailure(e.to_string())
    }
}

/// Geometry parse failures.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File is empty")]
    Empty,

    #[error("Truncated data: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Malformed {format} data: {detail}")]
    Malformed { format: &'static str, detail: String },

    #[error("Unsupported {format} variant: {detail}")]
    Unsupported { format: &'static str, detail: String },

    #[error("No geometry found in file")]
    NoGeometry,

    #[error("Decompression failed: {0}")]
    Decompress(#[from] std::io::Error),
}

/// Configuration parse failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid viewer config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid viewer config: {0}")]
    Value(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_load_is_silent() {
        assert!(!ViewerError::StaleLoad { generation: 3 }.is_user_facing());
        assert!(ViewerError::LoadFailure("bad".into()).is_user_facing());
    }

    #[test]
    fn parse_error_becomes_load_failure() {
        let err: ViewerError = ParseError::NoGeometry.into();
        assert!(matches!(err, ViewerError::LoadFailure(ref m) if m.contains("No geometry")));
    }
}
