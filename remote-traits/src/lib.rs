//! Boundary traits between the sync core and the remote photo service.
//!
//! The core never talks HTTP or JSON directly; it consumes the capabilities
//! defined here and the provider crates implement them. This keeps retry and
//! aggregation logic testable against mocks and keeps credential handling out
//! of the core entirely.

pub mod error;
pub mod http;
pub mod listing;
pub mod upload;

pub use error::{RemoteError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use listing::{Page, PagedSource};
pub use upload::MediaUploader;
