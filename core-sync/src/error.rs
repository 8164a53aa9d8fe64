use core_dedup::DedupError;
use remote_traits::RemoteError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Invalid concurrency or retry parameters, rejected before any work
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The retry budget for one file ran out without a positive acknowledgment
    #[error("remote service did not accept the upload after {attempts} attempts")]
    UploadExhausted { attempts: u32 },

    /// Fingerprinting or dedup store failure
    #[error(transparent)]
    Dedup(#[from] DedupError),

    /// Remote boundary failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A worker task ended abnormally
    #[error("worker task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
