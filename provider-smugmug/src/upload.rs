//! Single-attempt media upload to the SmugMug upload host.

use async_trait::async_trait;
use bytes::Bytes;
use remote_traits::{
    http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy},
    upload::MediaUploader,
    RemoteError,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::SmugMugError;
use crate::types::UploadAck;
use crate::{ALBUM_URI_BASE, UPLOAD_URI};

/// Determine the Content-Type header value from the file extension.
fn media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Uploader posting raw image bytes to the SmugMug upload host.
///
/// One call is one attempt: the file is read fresh, transmitted fully, and
/// the JSON acknowledgment interpreted. Only `stat == "ok"` counts as
/// success.
pub struct SmugMugUploader {
    transport: Arc<dyn HttpClient>,
    token: String,
    upload_uri: String,
}

impl SmugMugUploader {
    pub fn new(transport: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            transport,
            token: token.into(),
            upload_uri: UPLOAD_URI.to_string(),
        }
    }

    /// Override the upload host, for tests.
    pub fn with_upload_uri(mut self, uri: impl Into<String>) -> Self {
        self.upload_uri = uri.into();
        self
    }
}

#[async_trait]
impl MediaUploader for SmugMugUploader {
    async fn upload_media(
        &self,
        album_key: &str,
        path: &Path,
        digest_hex: &str,
        size: u64,
    ) -> remote_traits::Result<()> {
        // Open fresh on every attempt; a previous partial read must not leak
        // into this one.
        let body = tokio::fs::read(path)
            .await
            .map_err(|e| RemoteError::Request(format!("failed to read {}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RemoteError::Request(format!("invalid file name: {}", path.display())))?
            .to_string();

        debug!(
            album_key,
            file_name = %file_name,
            size,
            "transmitting media"
        );

        let request = HttpRequest::new(HttpMethod::Post, self.upload_uri.clone())
            .bearer_token(&self.token)
            .header("Accept", "application/json")
            .header("Content-Type", media_type(path))
            .header("Content-MD5", digest_hex)
            .header("X-Smug-AlbumUri", format!("{}/{}", ALBUM_URI_BASE, album_key))
            .header("X-Smug-ResponseType", "JSON")
            .header("X-Smug-Version", "v2")
            .header("X-Smug-FileName", &file_name)
            .body(Bytes::from(body));

        let response = self
            .transport
            .execute_with_retry(request, RetryPolicy::none())
            .await?;

        if !response.is_success() {
            warn!(status = response.status, file_name = %file_name, "upload rejected");
            return Err(SmugMugError::Api {
                status: response.status,
                message: response.text().unwrap_or_default(),
            }
            .into());
        }

        let ack: UploadAck = response
            .json()
            .map_err(|e| SmugMugError::Decode(e.to_string()))?;

        if ack.is_ok() {
            Ok(())
        } else {
            Err(SmugMugError::Api {
                status: response.status,
                message: ack.message,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use remote_traits::http::HttpResponse;
    use std::collections::HashMap;
    use std::io::Write;

    mock! {
        Transport {}

        #[async_trait]
        impl HttpClient for Transport {
            async fn execute(&self, request: HttpRequest) -> remote_traits::Result<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> remote_traits::Result<HttpResponse>;
        }
    }

    fn temp_image(bytes: &[u8]) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new()
            .suffix(".jpg")
            .tempfile()
            .unwrap();
        file.write_all(bytes).unwrap();
        file.into_temp_path()
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_success() {
        let path = temp_image(b"jpeg bytes");

        let mut transport = MockTransport::new();
        transport
            .expect_execute_with_retry()
            .times(1)
            .returning(|request, policy| {
                assert_eq!(policy.max_attempts, 1);
                assert_eq!(request.method, HttpMethod::Post);
                assert_eq!(
                    request.headers.get("X-Smug-AlbumUri"),
                    Some(&"/api/v2/album/k1".to_string())
                );
                assert_eq!(
                    request.headers.get("Content-Type"),
                    Some(&"image/jpeg".to_string())
                );
                assert!(request.headers.contains_key("Content-MD5"));
                assert_eq!(request.body.as_ref().unwrap().len(), 10);
                Ok(json_response(200, r#"{"stat": "ok"}"#))
            });

        let uploader = SmugMugUploader::new(Arc::new(transport), "token");
        let result = uploader.upload_media("k1", &path, "abc123", 10).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_upload_negative_ack_is_error() {
        let path = temp_image(b"data");

        let mut transport = MockTransport::new();
        transport
            .expect_execute_with_retry()
            .times(1)
            .returning(|_, _| {
                Ok(json_response(
                    200,
                    r#"{"stat": "fail", "message": "no such album"}"#,
                ))
            });

        let uploader = SmugMugUploader::new(Arc::new(transport), "token");
        let result = uploader.upload_media("k1", &path, "abc", 4).await;
        assert!(matches!(result, Err(RemoteError::Api { .. })));
    }

    #[tokio::test]
    async fn test_upload_unparseable_ack_is_decode_error() {
        let path = temp_image(b"data");

        let mut transport = MockTransport::new();
        transport
            .expect_execute_with_retry()
            .times(1)
            .returning(|_, _| Ok(json_response(200, "garbage")));

        let uploader = SmugMugUploader::new(Arc::new(transport), "token");
        let result = uploader.upload_media("k1", &path, "abc", 4).await;
        assert!(matches!(result, Err(RemoteError::Decode(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_request_error() {
        let transport = MockTransport::new();
        let uploader = SmugMugUploader::new(Arc::new(transport), "token");
        let result = uploader
            .upload_media("k1", Path::new("/nonexistent/file.jpg"), "abc", 0)
            .await;
        assert!(matches!(result, Err(RemoteError::Request(_))));
    }

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(media_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(media_type(Path::new("a.png")), "image/png");
        assert_eq!(media_type(Path::new("a.mov")), "video/quicktime");
        assert_eq!(media_type(Path::new("a.unknown")), "application/octet-stream");
        assert_eq!(media_type(Path::new("noext")), "application/octet-stream");
    }
}
