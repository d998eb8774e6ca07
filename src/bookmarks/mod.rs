//! Bookmark records and the annotation engine.
//!
//! A bookmark is zero or more annotations attached to one transcript
//! paragraph. Records are keyed by user and by a fixed-point bookmark id
//! (see [`crate::key`]), shard into one backend table per source, and hold
//! an annotation list in which each entry is identified by its creation
//! stamp.

mod engine;
mod types;

pub use engine::BookmarkEngine;
pub use types::{
    Annotation, AnnotationPayload, BookmarkRecord, QueryMatch, WriteIntent, WriteOutcome,
};
