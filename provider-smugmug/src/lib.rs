//! SmugMug API v2 provider.
//!
//! Implements the `remote-traits` capabilities against the SmugMug REST API:
//! paginated album and image listings as [`PagedSource`]s and single-attempt
//! media uploads as a [`MediaUploader`]. Credential acquisition is out of
//! scope; the provider is handed a ready-to-use access token and sets the
//! `Authorization` header itself.

pub mod error;
pub mod pages;
pub mod types;
pub mod upload;
pub mod user;

pub use error::{Result, SmugMugError};
pub use pages::{AlbumImageSource, AlbumSearchSource, AlbumSource};
pub use upload::SmugMugUploader;
pub use user::{current_user_albums_uri, current_user_uri};

/// SmugMug API base URL.
pub const API_ROOT: &str = "https://api.smugmug.com";

/// Endpoint resolving the currently authenticated user.
pub const API_CURRENT_USER: &str = "https://api.smugmug.com/api/v2!authuser";

/// Base URI path for a single album.
pub const ALBUM_URI_BASE: &str = "/api/v2/album";

/// Album search endpoint.
pub const ALBUM_SEARCH_URI: &str = "https://api.smugmug.com/api/v2/album!search";

/// Dedicated upload host.
pub const UPLOAD_URI: &str = "https://upload.smugmug.com/";
