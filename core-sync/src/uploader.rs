//! Bounded-concurrency upload worker pool.
//!
//! Each file flows through fingerprinting, a duplicate check against the
//! dedup store, and up to the configured number of transmission attempts.
//! A counting semaphore caps in-flight transmissions at the configured
//! concurrency; fingerprinting and dedup checks are cheap local work and run
//! outside the cap. Joining every spawned task is the batch barrier.

use core_dedup::{fingerprint_file, AlbumKey, DedupStore};
use remote_traits::upload::MediaUploader;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::{Result, SyncError};

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum number of concurrent transmissions, must be at least 1
    pub concurrency: usize,
    /// Total attempt budget per file. This is the literal number of tries:
    /// callers wanting "one try plus N retries" pass N + 1. A value of 0 is
    /// treated as 1, since at least one attempt always happens.
    pub attempts: u32,
    /// Whether to consult the dedup store and skip known content
    pub skip_duplicates: bool,
}

impl UploadConfig {
    fn effective_attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

/// Terminal state of one file in a batch.
#[derive(Debug)]
pub enum UploadStatus {
    /// The service acknowledged the upload. `recorded` is false when the
    /// dedup store could not persist the bookkeeping afterwards; the upload
    /// itself still happened.
    Uploaded { recorded: bool },
    /// Identical content is already in the album under these filenames; no
    /// transmission was attempted. Not a failure.
    Skipped { existing: Vec<String> },
    /// The file could not be uploaded
    Failed { error: SyncError },
    /// The batch was cancelled before this file started
    Cancelled,
}

/// Per-file result of a batch upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub path: PathBuf,
    pub status: UploadStatus,
}

impl UploadOutcome {
    /// Whether the file ended in an acceptable state (uploaded or skipped).
    pub fn succeeded(&self) -> bool {
        matches!(
            self.status,
            UploadStatus::Uploaded { .. } | UploadStatus::Skipped { .. }
        )
    }
}

/// Uploads batches of local files to one album with bounded concurrency and
/// a per-file retry budget.
pub struct UploadPool {
    uploader: Arc<dyn MediaUploader>,
    store: Arc<DedupStore>,
    config: UploadConfig,
}

impl UploadPool {
    /// Validates the configuration before any work starts.
    pub fn new(
        uploader: Arc<dyn MediaUploader>,
        store: Arc<DedupStore>,
        config: UploadConfig,
    ) -> Result<Self> {
        if config.concurrency < 1 {
            return Err(SyncError::Configuration(
                "upload concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            uploader,
            store,
            config,
        })
    }

    /// Upload a batch of files into `album`.
    ///
    /// Returns one outcome per file, in input order. Batch completion means
    /// every file was attempted; individual outcomes carry success, skip or
    /// failure, and a failure never aborts sibling uploads.
    #[instrument(skip_all, fields(album = %album, files = files.len()))]
    pub async fn upload_batch(
        &self,
        album: &AlbumKey,
        files: Vec<PathBuf>,
        cancel: CancellationToken,
    ) -> Vec<UploadOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let attempts = self.config.effective_attempts();

        let mut handles = Vec::with_capacity(files.len());
        for path in files {
            let uploader = Arc::clone(&self.uploader);
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let album = album.clone();
            let skip_duplicates = self.config.skip_duplicates;
            let task_path = path.clone();

            let handle = tokio::spawn(async move {
                upload_one(
                    uploader,
                    store,
                    album,
                    task_path,
                    attempts,
                    skip_duplicates,
                    semaphore,
                    cancel,
                )
                .await
            });
            handles.push((path, handle));
        }

        // Join-all is the batch barrier: nothing completes until every file
        // has reported.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let status = match handle.await {
                Ok(status) => status,
                Err(join_error) => {
                    error!(path = %path.display(), %join_error, "upload task ended abnormally");
                    UploadStatus::Failed {
                        error: SyncError::Task(join_error.to_string()),
                    }
                }
            };
            outcomes.push(UploadOutcome { path, status });
        }
        outcomes
    }
}

#[allow(clippy::too_many_arguments)]
async fn upload_one(
    uploader: Arc<dyn MediaUploader>,
    store: Arc<DedupStore>,
    album: AlbumKey,
    path: PathBuf,
    attempts: u32,
    skip_duplicates: bool,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> UploadStatus {
    if cancel.is_cancelled() {
        return UploadStatus::Cancelled;
    }

    // A file that cannot be read will not become readable on retry.
    let fingerprint = match fingerprint_file(&path).await {
        Ok(fingerprint) => fingerprint,
        Err(error) => {
            warn!(path = %path.display(), %error, "cannot fingerprint file");
            return UploadStatus::Failed {
                error: error.into(),
            };
        }
    };

    if skip_duplicates {
        match store.find_duplicates(&album, &fingerprint).await {
            Ok(existing) if !existing.is_empty() => {
                info!(
                    path = %path.display(),
                    album = %album,
                    fingerprint = %fingerprint,
                    ?existing,
                    "content already present in album; skipping upload"
                );
                return UploadStatus::Skipped { existing };
            }
            Ok(_) => {}
            Err(error) => {
                // A redundant upload beats an aborted one.
                warn!(%error, "duplicate check failed; proceeding with upload");
            }
        }
    }

    // Transmission slot; held across the whole retry loop for this file.
    let _permit = match Arc::clone(&semaphore).acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return UploadStatus::Failed {
                error: SyncError::Task("upload semaphore closed".to_string()),
            }
        }
    };

    // The wait for a slot can be long; honor a cancellation that arrived
    // meanwhile. Once transmission starts it runs to completion.
    if cancel.is_cancelled() {
        return UploadStatus::Cancelled;
    }

    let digest_hex = fingerprint.digest_hex();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    for attempt in 1..=attempts {
        match uploader
            .upload_media(album.as_str(), &path, &digest_hex, fingerprint.size())
            .await
        {
            Ok(()) => {
                info!(path = %path.display(), album = %album, attempt, "upload acknowledged");
                let recorded = match store.record_upload(&album, &fingerprint, &filename).await {
                    Ok(()) => true,
                    Err(error) => {
                        // The remote upload already happened; losing the
                        // bookkeeping risks a future duplicate, so shout.
                        error!(
                            path = %path.display(),
                            album = %album,
                            %error,
                            "upload succeeded but could not be recorded in the dedup store"
                        );
                        false
                    }
                };
                return UploadStatus::Uploaded { recorded };
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    attempt,
                    attempts,
                    %error,
                    "upload attempt failed"
                );
            }
        }
    }

    UploadStatus::Failed {
        error: SyncError::UploadExhausted { attempts },
    }
}
