//! Content-addressed deduplication for album uploads.
//!
//! Two pieces: a streaming content fingerprinter and a durable SQLite index
//! mapping (album, fingerprint) to the filenames already known to carry that
//! content. The store is the only durable artifact of the whole tool and is
//! schema-versioned so an incompatible database refuses to operate instead of
//! being silently reinterpreted.

pub mod error;
pub mod fingerprint;
pub mod store;

pub use error::{DedupError, Result};
pub use fingerprint::{fingerprint_file, ContentFingerprint};
pub use store::{AlbumKey, DedupStore, ImageEntry, SCHEMA_VERSION};
