//! Data types and associated functions and methods

use crate::error::AirwatchError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use strum_macros::Display;
use validator::Validate;

/// Data categories stored in the bucket
///
/// Each category is a top-level folder, partitioned below by `{year}/{month}/{day}/{hour}/`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    /// Raw readings, one record every few seconds
    #[default]
    RawData,
    /// Hourly averages
    HourAvg,
    /// Minute averages
    MinAvg,
    /// Minute-level trend summaries
    MinTrend,
}

impl Category {
    /// All categories, in candidate probing order.
    pub const ALL: [Category; 4] = [
        Category::RawData,
        Category::HourAvg,
        Category::MinAvg,
        Category::MinTrend,
    ];

    /// Returns the folder prefix of this category, including the trailing slash.
    pub fn prefix(self) -> String {
        format!("{}/", self)
    }
}

impl FromStr for Category {
    type Err = AirwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.to_string() == s)
            .ok_or_else(|| AirwatchError::UnknownCategory {
                category: s.to_string(),
            })
    }
}

/// A listed object and the metadata we use from the listing
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectSummary {
    /// Full object key
    pub key: String,
    /// Last modification time, if reported by the store
    pub last_modified: Option<DateTime<Utc>>,
    /// Object size in bytes
    pub size: i64,
}

/// Decoded content of one object
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// An ordered sequence of records, from a JSON array or NDJSON
    Records(Vec<Value>),
    /// Any other single JSON document, typically an aggregate object
    Document(Value),
}

/// Returns the final path segment of an object key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Optional category selector accepted as a query parameter
#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    /// Category to read from
    pub category: Option<Category>,
}

/// Query parameters of a date range listing
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    /// First day, `YYYYMMDD`
    pub start: String,
    /// Last day, `YYYYMMDD`, inclusive. Defaults to `start`.
    pub end: Option<String>,
    /// Category to list
    pub category: Option<Category>,
}

/// Latest file in a category and its last record
#[derive(Debug, Serialize)]
pub struct LatestFile {
    pub filename: String,
    pub data: Value,
}

/// Final record of a resolved file
#[derive(Debug, Serialize)]
pub struct LastRecord {
    pub data: Value,
}

/// Marker stored in place of a file that could not be read
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileFailure {
    pub error: String,
}

impl FileFailure {
    /// The marker used for every per-file failure in batch responses.
    pub fn read_failed() -> Self {
        FileFailure {
            error: "Failed to read file".to_string(),
        }
    }
}

/// Per-file result in batch responses
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FileOutcome {
    Data(Payload),
    Failed(FileFailure),
}

/// One file in a history listing
#[derive(Debug, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub data: FileOutcome,
}

/// All files of one day, newest first
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub date: String,
    pub total_files: usize,
    pub files: Vec<HistoryEntry>,
}

/// All files of one day, keyed by file name
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesByDate {
    pub date: String,
    pub total_files: usize,
    pub files: BTreeMap<String, FileOutcome>,
}

/// Keys found in a range of days
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRange {
    pub start: String,
    pub end: String,
    pub total_files: usize,
    pub files: Vec<String>,
}

/// Question for the chat helper
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    /// Free text question
    #[validate(length(min = 1, max = 1000, message = "query must be 1 to 1000 characters"))]
    pub query: String,
}
