//! Concurrent fetch/upload pipeline.
//!
//! Two coordinators live here: the pagination aggregator, which fans out one
//! fetch task per remote page and merges their results, and the upload worker
//! pool, which pushes a batch of local files through fingerprinting, a
//! duplicate check and a bounded number of concurrent transmissions with a
//! per-file retry budget. Per-unit failures never abort sibling work; a batch
//! is "complete" when every unit has been attempted, and callers inspect the
//! individual outcomes.

pub mod aggregator;
pub mod error;
pub mod uploader;

pub use aggregator::{list_all, DEFAULT_PAGE_SIZE};
pub use error::{Result, SyncError};
pub use uploader::{UploadConfig, UploadOutcome, UploadPool, UploadStatus};
