//! Sharded storage engine for annotated bookmarks over multi-source
//! transcript libraries.
//!
//! Bookmarks are keyed by user and by a fixed-point id: the integer digits
//! form a source-specific page key (the first two always name the source)
//! and the three fractional digits index a paragraph. Records shard into
//! one backend table per source and hold a list of annotations, each
//! identified by its creation stamp.
//!
//! # Modules
//!
//! - [`key`]: bookmark ids, the source registry, and range construction
//! - [`storage`]: the [`RecordStore`] seam with DynamoDB and in-memory
//!   implementations
//! - [`bookmarks`]: the [`BookmarkEngine`] mutation and query logic
//!
//! The HTTP layer, outbound mail, and the backing key-value service itself
//! are external collaborators.
//!
//! ```no_run
//! use marginalia::{AnnotationPayload, BookmarkEngine, Config, DynamoRecordStore};
//!
//! # async fn run() -> marginalia::Result<()> {
//! let store = DynamoRecordStore::connect(&Config::from_env()).await;
//! let engine = BookmarkEngine::new(store);
//!
//! let payload = AnnotationPayload::new("a note", vec!["healing".to_string()]);
//! let outcome = engine
//!     .put_annotation("user@example.com", "1300100.001", payload, Some(1_500_000_000_000))
//!     .await?;
//! println!("{}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod bookmarks;
pub mod config;
pub mod error;
pub mod key;
pub mod storage;

pub use bookmarks::{
    Annotation, AnnotationPayload, BookmarkEngine, BookmarkRecord, QueryMatch, WriteOutcome,
};
pub use config::Config;
pub use error::{BookmarkError, Result, StoreError};
pub use key::{key_range, BookmarkId, KeyRange, Source};
pub use storage::{DynamoRecordStore, MemoryRecordStore, RecordStore};
