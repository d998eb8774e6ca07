//! Configuration for the storage backend.

use serde::Deserialize;
use std::env;

/// Backend configuration.
///
/// Shard tables are named `<table_base><2-digit source prefix>`, so one
/// logical deployment owns a family of tables (`bookmarks10`,
/// `bookmarks13`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub table_base: String,
    pub region: String,
    /// Endpoint override for a local DynamoDB instance; `None` uses the
    /// real service endpoint for the region.
    pub endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            table_base: "bookmarks".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            table_base: env::var("BOOKMARKS_TABLE_BASE").unwrap_or(defaults.table_base),
            region: env::var("BOOKMARKS_REGION").unwrap_or(defaults.region),
            endpoint: env::var("DYNAMODB_ENDPOINT").ok(),
        }
    }

    /// Configuration pointing at a local DynamoDB instance.
    pub fn local() -> Self {
        Config {
            endpoint: Some("http://localhost:8000".to_string()),
            ..Config::default()
        }
    }
}
