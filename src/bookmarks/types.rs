//! Bookmark record and annotation types.
//!
//! Wire field names follow the persisted row shape: `userId`, `bookmarkId`,
//! and a `bookmark` list of annotations keyed by `creationDate`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::key::BookmarkId;

/// A single user-authored note attached to a bookmark record.
///
/// `creation_date` is a millisecond timestamp that doubles as the
/// annotation's unique identity within its record; no two annotations in
/// one record share it, and no persisted annotation lacks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub comment: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(rename = "creationDate")]
    pub creation_date: i64,
}

impl Annotation {
    /// The creation stamp as a UTC timestamp, when it is in range.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.creation_date)
    }
}

/// Wire payload for annotation writes.
///
/// A present `creationDate` signals an update to the matching existing
/// annotation; an absent one signals an insert whose identity comes from
/// the externally supplied annotation id. String-typed stamps are
/// normalized to integers during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationPayload {
    pub comment: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(
        rename = "creationDate",
        default,
        deserialize_with = "stamp_or_string"
    )]
    pub creation_date: Option<i64>,
}

impl AnnotationPayload {
    /// Payload for a new annotation.
    pub fn new(comment: impl Into<String>, topics: Vec<String>) -> Self {
        AnnotationPayload {
            comment: comment.into(),
            topics,
            creation_date: None,
        }
    }

    /// Mark this payload as an update of the annotation with the given
    /// creation stamp.
    pub fn amending(mut self, stamp: i64) -> Self {
        self.creation_date = Some(stamp);
        self
    }

    /// Classify the write once, at ingress. A zero stamp counts as unset.
    pub fn intent(&self) -> WriteIntent {
        match self.creation_date {
            Some(stamp) if stamp != 0 => WriteIntent::Update(stamp),
            _ => WriteIntent::Insert,
        }
    }

    /// Finalize into a persistable annotation under the given identity.
    pub fn into_annotation(self, creation_date: i64) -> Annotation {
        Annotation {
            comment: self.comment,
            topics: self.topics,
            creation_date,
        }
    }
}

fn stamp_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| D::Error::custom("creationDate is not an integer")),
        Some(serde_json::Value::String(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom("creationDate is not an integer")),
        Some(other) => Err(D::Error::custom(format!(
            "creationDate has unsupported type: {}",
            other
        ))),
    }
}

/// Write signal derived from an [`AnnotationPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIntent {
    /// New annotation; identity comes from the supplied annotation id.
    Insert,
    /// Replace the existing annotation carrying this creation stamp.
    Update(i64),
}

/// A stored bookmark row: every annotation for one `(userId, bookmarkId)`.
///
/// The annotation list preserves insertion order, though the order carries
/// no meaning. An empty list is a valid persisted state left behind by
/// annotation deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "bookmarkId")]
    pub bookmark_id: BookmarkId,
    #[serde(rename = "bookmark")]
    pub annotations: Vec<Annotation>,
}

impl BookmarkRecord {
    pub fn new(user_id: impl Into<String>, bookmark_id: BookmarkId) -> Self {
        BookmarkRecord {
            user_id: user_id.into(),
            bookmark_id,
            annotations: Vec::new(),
        }
    }

    /// A record emptied by annotation deletion: still a row, excluded from
    /// query results.
    pub fn is_tombstone(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// A query result row with the partition identity stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryMatch {
    pub id: BookmarkId,
    #[serde(rename = "bookmark")]
    pub annotations: Vec<Annotation>,
}

/// Result of a `put_annotation` call.
///
/// `Duplicate` and `IdNotUnique` are successful no-ops that carry an
/// explanatory message; nothing was written for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted {
        stamp: i64,
    },
    Updated {
        stamp: i64,
    },
    /// The update matched an existing annotation with identical content.
    Duplicate {
        user_id: String,
        bookmark_id: BookmarkId,
        stamp: i64,
    },
    /// The insert reused a creation stamp already present in the record.
    IdNotUnique {
        user_id: String,
        bookmark_id: BookmarkId,
        stamp: i64,
    },
}

impl WriteOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            WriteOutcome::Duplicate { .. } | WriteOutcome::IdNotUnique { .. }
        )
    }

    pub fn stamp(&self) -> i64 {
        match self {
            WriteOutcome::Inserted { stamp }
            | WriteOutcome::Updated { stamp }
            | WriteOutcome::Duplicate { stamp, .. }
            | WriteOutcome::IdNotUnique { stamp, .. } => *stamp,
        }
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Inserted { stamp } => write!(f, "{} inserted", stamp),
            WriteOutcome::Updated { stamp } => write!(f, "{} updated", stamp),
            WriteOutcome::Duplicate {
                user_id,
                bookmark_id,
                stamp,
            } => write!(
                f,
                "Duplicate annotation: {}/{}:{}",
                user_id, bookmark_id, stamp
            ),
            WriteOutcome::IdNotUnique {
                user_id,
                bookmark_id,
                stamp,
            } => write!(
                f,
                "AnnotationId is not unique: {}/{}:{}",
                user_id, bookmark_id, stamp
            ),
        }
    }
}
