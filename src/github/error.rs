//! GitHub API error types.

use thiserror::Error;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("User not found: {0}")]
    UserNotFound(String),
}

impl ClientError {
    /// Create a status error, keeping only the first line of the body.
    pub fn status(status: u16, body: &str) -> Self {
        let message = body.lines().next().unwrap_or_default().trim().to_string();
        Self::Status { status, message }
    }
}
