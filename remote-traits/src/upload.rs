//! Media upload abstraction.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// One-shot media transmission to a remote album.
///
/// An implementation performs exactly one attempt per call: it opens the file
/// fresh, transmits it fully and interprets the acknowledgment. `Ok(())`
/// means the service explicitly accepted the upload; anything else is an
/// error. Retry budgets live with the caller.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Transmit `path` into the album identified by `album_key`.
    ///
    /// `digest_hex` is the lowercase hex MD5 of the file content and `size`
    /// its byte count; both are sent alongside the body so the service can
    /// verify the transfer.
    async fn upload_media(
        &self,
        album_key: &str,
        path: &Path,
        digest_hex: &str,
        size: u64,
    ) -> Result<()>;
}
