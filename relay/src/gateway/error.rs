use thiserror::Error;

/// Errors raised while reading gateway frames.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gateway frame exceeds {limit} bytes")]
    FrameTooLong { limit: usize },

    #[error("malformed gateway frame: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the session can keep reading after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GatewayError::Io(_))
    }
}
