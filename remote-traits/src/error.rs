use thiserror::Error;

/// Errors crossing the remote-service boundary.
///
/// Every failure a transport or provider can produce maps onto one of these
/// variants so the core can apply its retry policy uniformly: `Network` and
/// `Timeout` cover the connection dropping before an acknowledgment, `Decode`
/// covers an unparseable response body, and `Api` covers an explicit negative
/// acknowledgment from the service.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to decode remote response: {0}")]
    Decode(String),

    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("request construction failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
