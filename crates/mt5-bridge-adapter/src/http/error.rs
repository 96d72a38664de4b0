/*
[INPUT]:  Error sources (HTTP, gateway responses, serialization, terminal state)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failure talking to a broker terminal.
#[derive(Error, Debug)]
pub enum TerminalError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response
    #[error("Gateway error (status {status}): {message}")]
    Gateway { status: u16, message: String },

    /// A call that needs a terminal session was made before login
    #[error("No terminal session, login first")]
    NoSession,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from the gateway
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TerminalError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TerminalError::Http(_) | TerminalError::InvalidResponse(_) => true,
            TerminalError::Gateway { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Create a gateway error from status code and message
    pub fn gateway(status: StatusCode, message: impl Into<String>) -> Self {
        TerminalError::Gateway {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Result type alias for terminal operations
pub type Result<T> = std::result::Result<T, TerminalError>;
