//! Error types for the SmugMug provider.

use remote_traits::RemoteError;
use thiserror::Error;

/// SmugMug provider errors.
#[derive(Error, Debug)]
pub enum SmugMugError {
    /// API request returned a non-success status or a negative acknowledgment
    #[error("SmugMug API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse an API response body
    #[error("failed to parse SmugMug response: {0}")]
    Decode(String),

    /// The authuser endpoint returned no user URI
    #[error("no user URI found in authuser response")]
    MissingUserUri,

    /// Transport-level failure
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Result type for SmugMug operations.
pub type Result<T> = std::result::Result<T, SmugMugError>;

impl From<SmugMugError> for RemoteError {
    fn from(error: SmugMugError) -> Self {
        match error {
            SmugMugError::Api { status, message } => RemoteError::Api { status, message },
            SmugMugError::Decode(msg) => RemoteError::Decode(msg),
            SmugMugError::MissingUserUri => {
                RemoteError::Decode("no user URI found in authuser response".to_string())
            }
            SmugMugError::Remote(e) => e,
        }
    }
}
