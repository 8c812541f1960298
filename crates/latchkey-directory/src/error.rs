use thiserror::Error;

/// Errors raised inside the directory client.
///
/// None of these reach the decision engine: the client collapses them into
/// [`LookupOutcome::NetworkUnavailable`](crate::LookupOutcome) after logging.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Connection, TLS, timeout or body transfer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service rejected the bearer token
    #[error("Unauthorized request to {url}")]
    Unauthorized { url: String },

    /// The service answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DirectoryError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DirectoryError>;
