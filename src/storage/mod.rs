//! Persistence adapters for bookmark records.
//!
//! [`RecordStore`] is the seam between the engine and the key-value
//! backend. The production implementation is [`DynamoRecordStore`];
//! [`MemoryRecordStore`] serves tests and local development.

mod dynamo;
mod memory;

pub use dynamo::DynamoRecordStore;
pub use memory::MemoryRecordStore;

use async_trait::async_trait;

use crate::bookmarks::{Annotation, BookmarkRecord};
use crate::error::StoreError;
use crate::key::{BookmarkId, KeyRange};

/// Raw persistence primitives over the `(userId, bookmarkId)` keyspace.
///
/// Every source's records live in their own physical shard, resolved from
/// the 2-digit source prefix. Writes are full replaces with last-write-wins
/// semantics; there is no concurrency token and no retry at this layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point lookup. `None` means the row does not exist — distinct from a
    /// row holding an empty annotation list.
    async fn get(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
    ) -> Result<Option<BookmarkRecord>, StoreError>;

    /// Replace the full annotation list under `(user_id, bookmark_id)`,
    /// creating the row if absent.
    async fn put(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
        annotations: &[Annotation],
    ) -> Result<(), StoreError>;

    /// Remove the row entirely.
    async fn delete(&self, user_id: &str, bookmark_id: BookmarkId) -> Result<(), StoreError>;

    /// Scan the shard named by `source_prefix` for rows belonging to
    /// `user_id` with a sort key inside `range`, inclusive on both ends.
    /// Row order is the backend's scan order.
    async fn range_query(
        &self,
        user_id: &str,
        source_prefix: &str,
        range: KeyRange,
    ) -> Result<Vec<BookmarkRecord>, StoreError>;
}

/// Shard table name for a source prefix: the base name with the 2-digit
/// source identifier appended.
pub fn shard_table(table_base: &str, source_prefix: &str) -> String {
    format!("{}{}", table_base, source_prefix)
}
