//! Object retrieval and payload decoding.
//!
//! Objects hold either a single JSON document or newline-delimited JSON (one value per line).

use crate::error::AirwatchError;
use crate::models::Payload;
use crate::object_store::ObjectStore;

use futures::stream::{self, StreamExt};
use serde_json::Value;

/// Decode the text of an object.
///
/// The whole text is first parsed as one JSON document; arrays become [Payload::Records] and any
/// other value [Payload::Document]. If that fails, each non-blank line is parsed as a JSON value
/// and the values are collected in order.
///
/// # Arguments
///
/// * `key`: Object key, used in error messages
/// * `text`: Object body
pub fn parse_payload(key: &str, text: &str) -> Result<Payload, AirwatchError> {
    if text.trim().is_empty() {
        return Err(AirwatchError::EmptyObject {
            key: key.to_string(),
        });
    }
    let document = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(records)) => return Ok(Payload::Records(records)),
        Ok(value) => return Ok(Payload::Document(value)),
        Err(err) => err,
    };
    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(record) => records.push(record),
            Err(line_error) => {
                return Err(AirwatchError::Parse {
                    key: key.to_string(),
                    document,
                    line: index + 1,
                    line_error,
                })
            }
        }
    }
    tracing::debug!(key, records = records.len(), "parsed object as NDJSON");
    Ok(Payload::Records(records))
}

/// Download and decode one object.
///
/// # Arguments
///
/// * `store`: Object store
/// * `key`: Object key
#[tracing::instrument(level = "DEBUG", skip(store))]
pub async fn fetch_and_parse(store: &dyn ObjectStore, key: &str) -> Result<Payload, AirwatchError> {
    let bytes = store.get_object(key).await?;
    let text = std::str::from_utf8(&bytes).map_err(|source| AirwatchError::NotUtf8 {
        key: key.to_string(),
        source,
    })?;
    parse_payload(key, text)
}

/// Download and decode several objects concurrently, at most `limit` at a time.
///
/// Every key yields an entry; a failure for one key is returned in its entry and does not affect
/// the others. Entries are in the same order as `keys`.
///
/// # Arguments
///
/// * `store`: Object store
/// * `keys`: Object keys
/// * `limit`: Maximum number of downloads in flight
pub async fn fetch_many(
    store: &dyn ObjectStore,
    keys: Vec<String>,
    limit: usize,
) -> Vec<(String, Result<Payload, AirwatchError>)> {
    stream::iter(keys)
        .map(|key| async move {
            let result = fetch_and_parse(store, &key).await;
            if let Err(err) = &result {
                tracing::warn!(key = %key, error = %err, "failed to read file");
            }
            (key, result)
        })
        .buffered(limit.max(1))
        .collect()
        .await
}
