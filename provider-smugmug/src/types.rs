//! SmugMug API v2 response envelopes.
//!
//! All listing requests are sent with `_verbosity=1`, which flattens the
//! response to the fields requested via `_filter`.

use serde::{Deserialize, Serialize};

/// Pagination block present on every listing response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageInfo {
    /// Total number of items in the collection
    #[serde(default)]
    pub total: u32,
    /// 1-based index of the first item on this page
    #[serde(default)]
    pub start: u32,
    /// Number of items returned for this page
    #[serde(default)]
    pub count: u32,
    /// Number of items the request asked for
    #[serde(default)]
    pub requested_count: u32,
}

/// One album as returned by the albums listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Album {
    pub album_key: String,
    pub name: String,
}

/// One image as returned by the album images listing.
///
/// Only the archived MD5 and filename are requested; that is all the dedup
/// store needs to recognize content already present in the album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumImage {
    #[serde(rename = "ArchivedMD5")]
    pub archived_md5: String,
    pub file_name: String,
}

/// Reference to another API endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UriRef {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumsBody {
    #[serde(default)]
    pub album: Vec<Album>,
    #[serde(default)]
    pub pages: PageInfo,
}

/// Top-level envelope for the albums listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlbumsResponse {
    pub response: AlbumsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImagesBody {
    #[serde(default)]
    pub album_image: Vec<AlbumImage>,
    #[serde(default)]
    pub pages: PageInfo,
}

/// Top-level envelope for the album images listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImagesResponse {
    pub response: ImagesBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserBody {
    pub user: Option<UriRef>,
}

/// Top-level envelope for the authuser probe.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserResponse {
    pub response: UserBody,
}

/// Acknowledgment returned by the upload host.
///
/// `stat == "ok"` is the only positive acknowledgment; anything else means
/// the service did not accept the image.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAck {
    #[serde(default)]
    pub stat: String,
    #[serde(default)]
    pub message: String,
}

impl UploadAck {
    pub fn is_ok(&self) -> bool {
        self.stat == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_albums_response() {
        let json = r#"{
            "Response": {
                "Album": [
                    {"AlbumKey": "abc123", "Name": "Holidays"},
                    {"AlbumKey": "def456", "Name": "Birthdays"}
                ],
                "Pages": {"Total": 2, "Start": 1, "Count": 2, "RequestedCount": 100}
            }
        }"#;

        let resp: AlbumsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.response.album.len(), 2);
        assert_eq!(resp.response.album[0].album_key, "abc123");
        assert_eq!(resp.response.album[0].name, "Holidays");
        assert_eq!(resp.response.pages.total, 2);
    }

    #[test]
    fn test_deserialize_images_response() {
        let json = r#"{
            "Response": {
                "AlbumImage": [
                    {"ArchivedMD5": "d41d8cd98f00b204e9800998ecf8427e", "FileName": "beach.jpg"}
                ],
                "Pages": {"Total": 1, "Start": 1, "Count": 1, "RequestedCount": 1}
            }
        }"#;

        let resp: ImagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.response.album_image.len(), 1);
        assert_eq!(
            resp.response.album_image[0].archived_md5,
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(resp.response.album_image[0].file_name, "beach.jpg");
    }

    #[test]
    fn test_deserialize_empty_listing() {
        // An album with no images is a valid page, not an error.
        let json = r#"{"Response": {"Pages": {"Total": 0, "Start": 1, "Count": 0}}}"#;
        let resp: ImagesResponse = serde_json::from_str(json).unwrap();
        assert!(resp.response.album_image.is_empty());
        assert_eq!(resp.response.pages.total, 0);
    }

    #[test]
    fn test_deserialize_user_response() {
        let json = r#"{"Response": {"User": {"Uri": "/api/v2/user/someone"}}}"#;
        let resp: UserResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.response.user.unwrap().uri, "/api/v2/user/someone");
    }

    #[test]
    fn test_upload_ack() {
        let ok: UploadAck = serde_json::from_str(r#"{"stat": "ok"}"#).unwrap();
        assert!(ok.is_ok());

        let fail: UploadAck =
            serde_json::from_str(r#"{"stat": "fail", "message": "invalid album"}"#).unwrap();
        assert!(!fail.is_ok());
        assert_eq!(fail.message, "invalid album");
    }
}
