//! Reduction of decoded payloads into response bodies.

use crate::error::AirwatchError;
use crate::models::{file_name, FileFailure, FileOutcome, HistoryEntry, Payload};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

lazy_static! {
    static ref TIMESTAMP_PREFIX: Regex = Regex::new(r"^(\d{12})_").unwrap();
}

/// How a single payload is reduced
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReduceMode {
    /// The payload unchanged
    Full,
    /// The final record of a sequence, or an aggregate object unchanged
    LastOnly,
}

/// Reduce a payload to a JSON value.
///
/// # Arguments
///
/// * `payload`: Decoded payload
/// * `mode`: Reduction to apply
pub fn reduce(payload: Payload, mode: ReduceMode) -> Result<Value, AirwatchError> {
    match (mode, payload) {
        (ReduceMode::Full, Payload::Records(records)) => Ok(Value::Array(records)),
        (ReduceMode::Full, Payload::Document(value)) => Ok(value),
        (ReduceMode::LastOnly, Payload::Records(mut records)) => {
            records.pop().ok_or(AirwatchError::UnsupportedFormat {
                reason: "empty sequence has no last record",
            })
        }
        (ReduceMode::LastOnly, Payload::Document(value @ Value::Object(_))) => Ok(value),
        (ReduceMode::LastOnly, Payload::Document(_)) => Err(AirwatchError::UnsupportedFormat {
            reason: "expected a sequence of records or an object",
        }),
    }
}

/// Convert one fetch result into a batch entry.
fn outcome(result: Result<Payload, AirwatchError>) -> FileOutcome {
    match result {
        Ok(payload) => FileOutcome::Data(payload),
        Err(_) => FileOutcome::Failed(FileFailure::read_failed()),
    }
}

/// Merge concurrent fetch results into a map from file name to data or failure marker.
///
/// Every key is present in the result regardless of whether its fetch succeeded.
///
/// # Arguments
///
/// * `results`: `(key, result)` pairs
pub fn merge_by_filename(
    results: Vec<(String, Result<Payload, AirwatchError>)>,
) -> BTreeMap<String, FileOutcome> {
    results
        .into_iter()
        .map(|(key, result)| (file_name(&key).to_string(), outcome(result)))
        .collect()
}

/// Returns the `YYYYMMDDHHMM` timestamp a file name starts with, or zero.
pub fn embedded_timestamp(filename: &str) -> u64 {
    TIMESTAMP_PREFIX
        .captures(filename)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0)
}

/// Build history entries from fetch results, newest first by embedded timestamp.
///
/// Files without a timestamp prefix sort last. Ties keep their input order.
///
/// # Arguments
///
/// * `results`: `(key, result)` pairs
pub fn history_entries(results: Vec<(String, Result<Payload, AirwatchError>)>) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = results
        .into_iter()
        .map(|(key, result)| HistoryEntry {
            filename: file_name(&key).to_string(),
            data: outcome(result),
        })
        .collect();
    entries.sort_by(|a, b| embedded_timestamp(&b.filename).cmp(&embedded_timestamp(&a.filename)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure() -> AirwatchError {
        AirwatchError::ObjectNotFound {
            key: "gone".to_string(),
        }
    }

    #[test]
    fn full_passes_through() {
        let records = vec![json!({"temp": 1}), json!({"temp": 2})];
        assert_eq!(
            json!([{"temp": 1}, {"temp": 2}]),
            reduce(Payload::Records(records), ReduceMode::Full).unwrap()
        );
        assert_eq!(
            json!({"mintemp": 3}),
            reduce(Payload::Document(json!({"mintemp": 3})), ReduceMode::Full).unwrap()
        );
    }

    #[test]
    fn last_only_returns_final_record() {
        let records = vec![json!({"temp": 1}), json!({"temp": 2, "hum": [1, 2]})];
        assert_eq!(
            json!({"temp": 2, "hum": [1, 2]}),
            reduce(Payload::Records(records), ReduceMode::LastOnly).unwrap()
        );
    }

    #[test]
    fn last_only_object_unchanged() {
        let document = json!({"data": {"mintemp": 20.5, "minhum": 40, "mingas": 410}});
        assert_eq!(
            document.clone(),
            reduce(Payload::Document(document), ReduceMode::LastOnly).unwrap()
        );
    }

    #[test]
    fn last_only_rejects_empty_and_scalars() {
        assert!(matches!(
            reduce(Payload::Records(vec![]), ReduceMode::LastOnly),
            Err(AirwatchError::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            reduce(Payload::Document(json!(42)), ReduceMode::LastOnly),
            Err(AirwatchError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn merge_keeps_every_file() {
        let results = vec![
            (
                "rawdata/2025/08/12/09/202508120900_rawdata.json".to_string(),
                Ok(Payload::Records(vec![json!(1)])),
            ),
            (
                "rawdata/2025/08/12/10/202508121000_rawdata.json".to_string(),
                Err(failure()),
            ),
            (
                "rawdata/2025/08/12/11/202508121100_rawdata.json".to_string(),
                Ok(Payload::Document(json!({"a": 1}))),
            ),
        ];
        let merged = merge_by_filename(results);
        assert_eq!(3, merged.len());
        assert_eq!(
            FileOutcome::Failed(FileFailure::read_failed()),
            merged["202508121000_rawdata.json"]
        );
        assert_eq!(
            FileOutcome::Data(Payload::Records(vec![json!(1)])),
            merged["202508120900_rawdata.json"]
        );
    }

    #[test]
    fn timestamp_prefix() {
        assert_eq!(202501010900, embedded_timestamp("202501010900_x.json"));
        assert_eq!(0, embedded_timestamp("badname.json"));
        assert_eq!(0, embedded_timestamp("2025010109_x.json"));
    }

    #[test]
    fn history_newest_first() {
        let results = vec![
            ("a/202501010900_x.json".to_string(), Ok(Payload::Records(vec![]))),
            ("a/badname.json".to_string(), Ok(Payload::Records(vec![]))),
            ("a/202501011000_x.json".to_string(), Err(failure())),
        ];
        let names: Vec<String> = history_entries(results)
            .into_iter()
            .map(|entry| entry.filename)
            .collect();
        assert_eq!(
            vec!["202501011000_x.json", "202501010900_x.json", "badname.json"],
            names
        );
    }
}
