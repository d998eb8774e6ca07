//! Annotation mutation and query orchestration.
//!
//! Every mutation is a read-modify-write against the injected
//! [`RecordStore`], with no transaction across the read and the write: two
//! concurrent mutations of one record can both read the same prior state,
//! and the later put wins wholesale. Callers needing stronger guarantees
//! must serialize their own writes.

use tracing::debug;

use crate::error::{BookmarkError, Result};
use crate::key::{key_range, BookmarkId};
use crate::storage::RecordStore;

use super::types::{AnnotationPayload, BookmarkRecord, QueryMatch, WriteIntent, WriteOutcome};

/// Orchestrates annotation upsert, delete, and prefix queries over an
/// injected record store.
///
/// The engine is stateless across invocations; a single instance serves
/// concurrent callers.
pub struct BookmarkEngine<S> {
    store: S,
}

impl<S: RecordStore> BookmarkEngine<S> {
    pub fn new(store: S) -> Self {
        BookmarkEngine { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create or update one annotation under `(user_id, bookmark_id)`.
    ///
    /// A payload carrying a creation stamp updates the matching existing
    /// annotation; a payload without one inserts a new annotation whose
    /// identity becomes `annotation_id`. Duplicate updates and reused ids
    /// resolve as no-op outcomes, not errors, and skip the write.
    pub async fn put_annotation(
        &self,
        user_id: &str,
        bookmark_id: &str,
        payload: AnnotationPayload,
        annotation_id: Option<i64>,
    ) -> Result<WriteOutcome> {
        let id = checked_key(user_id, bookmark_id)?;

        let mut annotations;
        let outcome;
        match self.store.get(user_id, id).await? {
            Some(record) => {
                annotations = record.annotations;
                match payload.intent() {
                    WriteIntent::Update(stamp) => {
                        let index = annotations
                            .iter()
                            .position(|a| a.creation_date == stamp)
                            .ok_or_else(|| BookmarkError::AnnotationNotFound {
                                user_id: user_id.to_string(),
                                bookmark_id: id,
                                annotation_id: stamp.to_string(),
                            })?;
                        let replacement = payload.into_annotation(stamp);
                        if annotations[index] == replacement {
                            debug!(user_id, bookmark_id = %id, stamp, "duplicate annotation, skipping write");
                            return Ok(WriteOutcome::Duplicate {
                                user_id: user_id.to_string(),
                                bookmark_id: id,
                                stamp,
                            });
                        }
                        // Replace, not append-alongside: the old entry goes
                        // away and the new one lands at the end of the list.
                        annotations.remove(index);
                        annotations.push(replacement);
                        outcome = WriteOutcome::Updated { stamp };
                    }
                    WriteIntent::Insert => {
                        if let Some(stamp) = annotation_id {
                            if annotations.iter().any(|a| a.creation_date == stamp) {
                                debug!(user_id, bookmark_id = %id, stamp, "annotation id already taken, skipping write");
                                return Ok(WriteOutcome::IdNotUnique {
                                    user_id: user_id.to_string(),
                                    bookmark_id: id,
                                    stamp,
                                });
                            }
                        }
                        let stamp = required_stamp(annotation_id)?;
                        annotations.push(payload.into_annotation(stamp));
                        outcome = WriteOutcome::Inserted { stamp };
                    }
                }
            }
            None => {
                // New annotation on a new bookmark: the payload's own stamp
                // is ignored and the supplied id becomes the identity.
                let stamp = required_stamp(annotation_id)?;
                annotations = vec![payload.into_annotation(stamp)];
                outcome = WriteOutcome::Inserted { stamp };
            }
        }

        self.store.put(user_id, id, &annotations).await?;
        debug!(user_id, bookmark_id = %id, result = %outcome, "annotation written");
        Ok(outcome)
    }

    /// Delete the annotation with identity `annotation_id`, keeping the
    /// record itself: a record emptied of annotations stays behind as an
    /// empty row that [`Self::query`] filters out.
    ///
    /// Returns the remaining annotation count.
    pub async fn delete_annotation(
        &self,
        user_id: &str,
        bookmark_id: &str,
        annotation_id: &str,
    ) -> Result<usize> {
        if annotation_id.is_empty() {
            return Err(BookmarkError::MissingIdentity("annotationId"));
        }
        let id = checked_key(user_id, bookmark_id)?;
        debug!(user_id, bookmark_id = %id, annotation_id, "deleting annotation");

        let mut record = self.store.get(user_id, id).await?.ok_or_else(|| {
            BookmarkError::RecordNotFound {
                user_id: user_id.to_string(),
                bookmark_id: id,
            }
        })?;

        let stamp = annotation_id.parse::<i64>().ok();
        let index = record
            .annotations
            .iter()
            .position(|a| Some(a.creation_date) == stamp)
            .ok_or_else(|| BookmarkError::AnnotationNotFound {
                user_id: user_id.to_string(),
                bookmark_id: id,
                annotation_id: annotation_id.to_string(),
            })?;
        record.annotations.remove(index);

        self.store.put(user_id, id, &record.annotations).await?;
        Ok(record.annotations.len())
    }

    /// Remove the whole record. Unconditional: no read-before-write, and
    /// deleting a nonexistent record succeeds.
    pub async fn delete_bookmark(&self, user_id: &str, bookmark_id: &str) -> Result<()> {
        let id = checked_key(user_id, bookmark_id)?;
        debug!(user_id, bookmark_id = %id, "deleting bookmark");
        self.store.delete(user_id, id).await?;
        Ok(())
    }

    /// Point read. `None` means the record does not exist; a record whose
    /// annotations were all deleted still comes back, with an empty list.
    pub async fn get_bookmark(
        &self,
        user_id: &str,
        bookmark_id: &str,
    ) -> Result<Option<BookmarkRecord>> {
        let id = checked_key(user_id, bookmark_id)?;
        Ok(self.store.get(user_id, id).await?)
    }

    /// All non-empty bookmarks for `user_id` whose id starts with the given
    /// key fragment (full or partial page key, source prefix first).
    ///
    /// Result order is the backend's scan order and is not specified.
    pub async fn query(&self, user_id: &str, fragment: &str) -> Result<Vec<QueryMatch>> {
        if user_id.is_empty() {
            return Err(BookmarkError::MissingIdentity("userId"));
        }
        if fragment.is_empty() {
            return Err(BookmarkError::MissingIdentity("bookmarkId"));
        }

        let range = key_range(fragment);
        if range.is_empty() {
            // Unknown source or malformed fragment: matches nothing.
            debug!(user_id, fragment, "degenerate key range, returning no rows");
            return Ok(Vec::new());
        }

        let rows = self.store.range_query(user_id, &fragment[..2], range).await?;
        Ok(rows
            .into_iter()
            .filter(|record| !record.is_tombstone())
            .map(|record| QueryMatch {
                id: record.bookmark_id,
                annotations: record.annotations,
            })
            .collect())
    }
}

fn checked_key(user_id: &str, bookmark_id: &str) -> Result<BookmarkId> {
    if user_id.is_empty() {
        return Err(BookmarkError::MissingIdentity("userId"));
    }
    if bookmark_id.is_empty() {
        return Err(BookmarkError::MissingIdentity("bookmarkId"));
    }
    bookmark_id.parse()
}

// Zero is the unset sentinel carried over from the wire format.
fn required_stamp(annotation_id: Option<i64>) -> Result<i64> {
    match annotation_id {
        Some(stamp) if stamp != 0 => Ok(stamp),
        _ => Err(BookmarkError::MissingIdentity("annotationId")),
    }
}
