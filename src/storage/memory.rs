//! In-memory record store for tests and local development.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::bookmarks::{Annotation, BookmarkRecord};
use crate::error::StoreError;
use crate::key::{BookmarkId, KeyRange};

use super::RecordStore;

/// Ordered in-memory store with the same contract as the DynamoDB adapter.
///
/// Rows are keyed by `(userId, bookmarkId)`; range scans come back in
/// ascending sort-key order. Cloning shares the underlying rows.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    rows: Arc<RwLock<BTreeMap<(String, BookmarkId), Vec<Annotation>>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, tombstones included.
    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
    ) -> Result<Option<BookmarkRecord>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&(user_id.to_string(), bookmark_id))
            .map(|annotations| BookmarkRecord {
                user_id: user_id.to_string(),
                bookmark_id,
                annotations: annotations.clone(),
            }))
    }

    async fn put(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
        annotations: &[Annotation],
    ) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .insert((user_id.to_string(), bookmark_id), annotations.to_vec());
        Ok(())
    }

    async fn delete(&self, user_id: &str, bookmark_id: BookmarkId) -> Result<(), StoreError> {
        self.rows
            .write()
            .await
            .remove(&(user_id.to_string(), bookmark_id));
        Ok(())
    }

    async fn range_query(
        &self,
        user_id: &str,
        _source_prefix: &str,
        range: KeyRange,
    ) -> Result<Vec<BookmarkRecord>, StoreError> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.rows.read().await;
        let low = (user_id.to_string(), range.start);
        let high = (user_id.to_string(), range.end);
        Ok(rows
            .range(low..=high)
            .map(|((owner, bookmark_id), annotations)| BookmarkRecord {
                user_id: owner.clone(),
                bookmark_id: *bookmark_id,
                annotations: annotations.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::key_range;

    fn id(s: &str) -> BookmarkId {
        s.parse().unwrap()
    }

    fn annotation(stamp: i64) -> Annotation {
        Annotation {
            comment: "note".to_string(),
            topics: vec![],
            creation_date: stamp,
        }
    }

    #[tokio::test]
    async fn absent_row_differs_from_empty_row() {
        let store = MemoryRecordStore::new();
        assert!(store.get("u", id("1300100.001")).await.unwrap().is_none());

        store.put("u", id("1300100.001"), &[]).await.unwrap();
        let record = store.get("u", id("1300100.001")).await.unwrap().unwrap();
        assert!(record.annotations.is_empty());
    }

    #[tokio::test]
    async fn put_replaces_the_full_list() {
        let store = MemoryRecordStore::new();
        store
            .put("u", id("1300100.001"), &[annotation(1), annotation(2)])
            .await
            .unwrap();
        store.put("u", id("1300100.001"), &[annotation(3)]).await.unwrap();

        let record = store.get("u", id("1300100.001")).await.unwrap().unwrap();
        assert_eq!(record.annotations, vec![annotation(3)]);
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = MemoryRecordStore::new();
        store.put("u", id("1300100.001"), &[annotation(1)]).await.unwrap();
        store.delete("u", id("1300100.001")).await.unwrap();
        assert!(store.get("u", id("1300100.001")).await.unwrap().is_none());
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn range_scan_is_inclusive_on_both_ends() {
        let store = MemoryRecordStore::new();
        store.put("u", id("1300100.000"), &[annotation(1)]).await.unwrap();
        store.put("u", id("1300100.999"), &[annotation(2)]).await.unwrap();
        store.put("u", id("1300101.000"), &[annotation(3)]).await.unwrap();

        let rows = store
            .range_query("u", "13", key_range("1300100"))
            .await
            .unwrap();
        let ids: Vec<String> = rows.iter().map(|r| r.bookmark_id.to_string()).collect();
        assert_eq!(ids, vec!["1300100.000", "1300100.999"]);
    }

    #[tokio::test]
    async fn range_scan_is_scoped_to_the_user() {
        let store = MemoryRecordStore::new();
        store.put("u", id("1300100.001"), &[annotation(1)]).await.unwrap();
        store.put("v", id("1300100.002"), &[annotation(2)]).await.unwrap();

        let rows = store.range_query("u", "13", key_range("13")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, "u");
    }
}
