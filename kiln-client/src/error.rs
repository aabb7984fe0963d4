//! Error types for the Kiln client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the generation service
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (DNS, connection refused, timeout)
    #[error("network unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx HTTP status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, if it could be read
        message: String,
    },

    /// The response body does not match the expected schema
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The service accepted the HTTP request but refused the operation
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// A local asset could not be uploaded
    #[error("upload failed: {0}")]
    Upload(String),

    /// The request could not be built from the given input
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether repeating the same request may succeed
    ///
    /// Everything that depends on the network or the service state is
    /// retryable; a request that cannot even be built is not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(format!("Failed to parse JSON response: {}", err))
    }
}
