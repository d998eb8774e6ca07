//! Error types for the bookmark storage engine.

use thiserror::Error;

use crate::key::BookmarkId;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, BookmarkError>;

/// Engine-level error type
///
/// Benign outcomes (duplicate annotation, reused annotation id) are not
/// errors; they are reported as [`crate::bookmarks::WriteOutcome`] variants.
#[derive(Error, Debug)]
pub enum BookmarkError {
    /// A required identifier was absent or empty. The payload names the
    /// wire field that was missing.
    #[error("required identifier missing: {0}")]
    MissingIdentity(&'static str),

    /// A bookmark id that does not parse as a fixed-point key.
    #[error("invalid bookmark key: {0}")]
    InvalidKey(String),

    /// An update or delete referenced an annotation that is not in the
    /// record.
    #[error("annotation not found: {user_id}/{bookmark_id}:{annotation_id}")]
    AnnotationNotFound {
        user_id: String,
        bookmark_id: BookmarkId,
        annotation_id: String,
    },

    /// An operation that requires an existing record found none.
    #[error("bookmark not found: {user_id}/{bookmark_id}")]
    RecordNotFound {
        user_id: String,
        bookmark_id: BookmarkId,
    },

    /// Backend failure, surfaced unmodified. No retries happen below this
    /// point; the caller decides whether to retry or report upstream.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Storage-layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("DynamoDB error: {0}")]
    Sdk(String),

    #[error("malformed record: {0}")]
    Corrupt(String),
}
