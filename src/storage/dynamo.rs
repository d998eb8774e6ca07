//! DynamoDB-backed record store.
//!
//! One table per source shard; rows are
//! `{ userId: S, bookmarkId: N, bookmark: L }` with the composite primary
//! key on `(userId, bookmarkId)`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::{config::Region, types::AttributeValue, Client};

use crate::bookmarks::{Annotation, BookmarkRecord};
use crate::config::Config;
use crate::error::StoreError;
use crate::key::{BookmarkId, KeyRange};

use super::{shard_table, RecordStore};

/// DynamoDB record store.
///
/// Cheap to clone; the underlying SDK client is safe for concurrent use.
#[derive(Clone)]
pub struct DynamoRecordStore {
    client: Client,
    table_base: String,
}

impl DynamoRecordStore {
    /// Build a client from the default credential chain, honoring the
    /// configured region and optional local endpoint override.
    pub async fn connect(config: &Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        // Probe the connection so misconfiguration shows up at startup.
        match client.list_tables().limit(1).send().await {
            Ok(_) => {
                tracing::info!("Connected to DynamoDB ({})", config.region);
            }
            Err(e) => {
                tracing::warn!(
                    "Could not verify DynamoDB connection: {}. Will attempt operations anyway.",
                    e
                );
            }
        }

        DynamoRecordStore {
            client,
            table_base: config.table_base.clone(),
        }
    }

    fn table_for(&self, bookmark_id: BookmarkId) -> String {
        shard_table(&self.table_base, &bookmark_id.source_prefix())
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    async fn get(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
    ) -> Result<Option<BookmarkRecord>, StoreError> {
        let table = self.table_for(bookmark_id);
        let response = self
            .client
            .get_item()
            .table_name(&table)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("bookmarkId", AttributeValue::N(bookmark_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Sdk(format!("get on {} failed: {}", table, e)))?;

        response.item().map(record_from_item).transpose()
    }

    async fn put(
        &self,
        user_id: &str,
        bookmark_id: BookmarkId,
        annotations: &[Annotation],
    ) -> Result<(), StoreError> {
        let table = self.table_for(bookmark_id);
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S(user_id.to_string()));
        item.insert(
            "bookmarkId".to_string(),
            AttributeValue::N(bookmark_id.to_string()),
        );
        item.insert(
            "bookmark".to_string(),
            AttributeValue::L(annotations.iter().map(annotation_attr).collect()),
        );

        self.client
            .put_item()
            .table_name(&table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Sdk(format!("put on {} failed: {}", table, e)))?;
        Ok(())
    }

    async fn delete(&self, user_id: &str, bookmark_id: BookmarkId) -> Result<(), StoreError> {
        let table = self.table_for(bookmark_id);
        self.client
            .delete_item()
            .table_name(&table)
            .key("userId", AttributeValue::S(user_id.to_string()))
            .key("bookmarkId", AttributeValue::N(bookmark_id.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Sdk(format!("delete on {} failed: {}", table, e)))?;
        Ok(())
    }

    async fn range_query(
        &self,
        user_id: &str,
        source_prefix: &str,
        range: KeyRange,
    ) -> Result<Vec<BookmarkRecord>, StoreError> {
        let table = shard_table(&self.table_base, source_prefix);
        let mut items = Vec::new();
        let mut exclusive_start_key: Option<HashMap<String, AttributeValue>> = None;

        // Follow pagination to exhaustion: a single page caps out at 1 MB
        // of evaluated data.
        loop {
            let response = self
                .client
                .query()
                .table_name(&table)
                .key_condition_expression(
                    "userId = :address AND bookmarkId BETWEEN :start AND :end",
                )
                .expression_attribute_values(":address", AttributeValue::S(user_id.to_string()))
                .expression_attribute_values(":start", AttributeValue::N(range.start.to_string()))
                .expression_attribute_values(":end", AttributeValue::N(range.end.to_string()))
                .set_exclusive_start_key(exclusive_start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Sdk(format!("query on {} failed: {}", table, e)))?;

            items.extend(response.items().iter().cloned());

            match response.last_evaluated_key() {
                Some(key) => exclusive_start_key = Some(key.clone()),
                None => break,
            }
        }

        items.iter().map(record_from_item).collect()
    }
}

fn annotation_attr(annotation: &Annotation) -> AttributeValue {
    let topics = annotation
        .topics
        .iter()
        .cloned()
        .map(AttributeValue::S)
        .collect();

    let mut entry = HashMap::new();
    entry.insert(
        "comment".to_string(),
        AttributeValue::S(annotation.comment.clone()),
    );
    entry.insert("topics".to_string(), AttributeValue::L(topics));
    entry.insert(
        "creationDate".to_string(),
        AttributeValue::N(annotation.creation_date.to_string()),
    );
    AttributeValue::M(entry)
}

fn annotation_from_attr(value: &AttributeValue) -> Result<Annotation, StoreError> {
    let entry = value
        .as_m()
        .map_err(|_| StoreError::Corrupt("annotation is not a map".to_string()))?;

    let comment = entry
        .get("comment")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::Corrupt("annotation comment missing".to_string()))?
        .clone();

    let topics = match entry.get("topics") {
        Some(v) => v
            .as_l()
            .map_err(|_| StoreError::Corrupt("annotation topics is not a list".to_string()))?
            .iter()
            .map(|t| {
                t.as_s()
                    .map(|s| s.clone())
                    .map_err(|_| StoreError::Corrupt("annotation topic is not a string".to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let creation_date = entry
        .get("creationDate")
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| StoreError::Corrupt("annotation creationDate missing".to_string()))?
        .parse::<i64>()
        .map_err(|_| StoreError::Corrupt("annotation creationDate is not numeric".to_string()))?;

    Ok(Annotation {
        comment,
        topics,
        creation_date,
    })
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<BookmarkRecord, StoreError> {
    let user_id = item
        .get("userId")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::Corrupt("row userId missing".to_string()))?
        .clone();

    let bookmark_id = item
        .get("bookmarkId")
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| StoreError::Corrupt("row bookmarkId missing".to_string()))?
        .parse::<BookmarkId>()
        .map_err(|e| StoreError::Corrupt(format!("row bookmarkId: {}", e)))?;

    let annotations = match item.get("bookmark") {
        Some(v) => v
            .as_l()
            .map_err(|_| StoreError::Corrupt("row bookmark is not a list".to_string()))?
            .iter()
            .map(annotation_from_attr)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(BookmarkRecord {
        user_id,
        bookmark_id,
        annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(stamp: i64) -> Annotation {
        Annotation {
            comment: "a note".to_string(),
            topics: vec!["healing".to_string(), "forgiveness".to_string()],
            creation_date: stamp,
        }
    }

    #[test]
    fn annotation_survives_attribute_round_trip() {
        let original = annotation(1_500_000_000_000);
        let decoded = annotation_from_attr(&annotation_attr(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn record_decodes_from_a_row_item() {
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S("u".to_string()));
        item.insert(
            "bookmarkId".to_string(),
            AttributeValue::N("1300100.001".to_string()),
        );
        item.insert(
            "bookmark".to_string(),
            AttributeValue::L(vec![annotation_attr(&annotation(1000))]),
        );

        let record = record_from_item(&item).unwrap();
        assert_eq!(record.user_id, "u");
        assert_eq!(record.bookmark_id.to_string(), "1300100.001");
        assert_eq!(record.annotations, vec![annotation(1000)]);
    }

    #[test]
    fn record_decodes_normalized_numbers() {
        // DynamoDB strips trailing zeros from stored numbers.
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S("u".to_string()));
        item.insert(
            "bookmarkId".to_string(),
            AttributeValue::N("1300100".to_string()),
        );
        item.insert("bookmark".to_string(), AttributeValue::L(vec![]));

        let record = record_from_item(&item).unwrap();
        assert_eq!(record.bookmark_id.to_string(), "1300100.000");
        assert!(record.is_tombstone());
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let mut item = HashMap::new();
        item.insert("userId".to_string(), AttributeValue::S("u".to_string()));
        assert!(matches!(
            record_from_item(&item),
            Err(StoreError::Corrupt(_))
        ));
    }
}
