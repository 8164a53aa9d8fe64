use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    /// Local file unreadable; fatal for that file, never retried
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage engine failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The on-disk store was created by an incompatible build
    #[error("dedup store schema version is {found}, but this build expects {expected}")]
    VersionMismatch { found: i64, expected: i64 },
}

pub type Result<T> = std::result::Result<T, DedupError>;
