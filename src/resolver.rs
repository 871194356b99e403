//! Resolution of loosely specified file identifiers to object keys.
//!
//! Data files are stored as `{category}/{YYYY}/{MM}/{DD}/{HH}/{YYYYMMDDHHMM}_{category}.json`.
//! Clients usually ask for a file by its bare name, and older files may live elsewhere, so a
//! name is resolved with three strategies in turn:
//!
//! 1. If the name matches the timestamped pattern, its exact key is derived and probed.
//! 2. A fixed list of candidate keys is probed in order.
//! 3. For names without a timestamp, each category folder is listed and scanned for the name.
//!
//! Every key or prefix tried is reported when nothing matches.

use crate::error::AirwatchError;
use crate::models::{file_name, Category};
use crate::object_store::ObjectStore;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::time::Instant;

lazy_static! {
    static ref TIMESTAMPED_NAME: Regex =
        Regex::new(r"^(\d{4})(\d{2})(\d{2})(\d{2})(\d{2})_([a-z]+)\.json$").unwrap();
}

/// Longest identifier accepted.
const MAX_IDENTIFIER_LEN: usize = 255;

/// Check that an identifier only uses `[A-Za-z0-9._-]`.
///
/// Keys are built by concatenation, so anything else (notably `/`) is rejected before the store is
/// contacted.
pub fn validate_identifier(identifier: &str) -> Result<(), AirwatchError> {
    let valid = !identifier.is_empty()
        && identifier.len() <= MAX_IDENTIFIER_LEN
        && identifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(AirwatchError::InvalidIdentifier {
            identifier: identifier.to_string(),
        })
    }
}

/// Components of a `YYYYMMDDHHMM_{category}.json` file name
#[derive(Clone, Debug, PartialEq)]
pub struct TimestampedName {
    pub category: Category,
    pub year: String,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
}

impl TimestampedName {
    /// Parse a file name, returning `None` unless it matches the pattern with a real date and time
    /// and a known category suffix.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = TIMESTAMPED_NAME.captures(name)?;
        let category: Category = captures[6].parse().ok()?;
        let number = |index: usize| captures[index].parse::<u32>().ok();
        NaiveDate::from_ymd_opt(number(1)? as i32, number(2)?, number(3)?)?;
        if number(4)? > 23 || number(5)? > 59 {
            return None;
        }
        Some(TimestampedName {
            category,
            year: captures[1].to_string(),
            month: captures[2].to_string(),
            day: captures[3].to_string(),
            hour: captures[4].to_string(),
            minute: captures[5].to_string(),
        })
    }

    /// Returns the key at which a file with this name is written.
    pub fn key(&self, name: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.category, self.year, self.month, self.day, self.hour, name
        )
    }
}

/// Build the ordered candidate keys for an identifier.
///
/// The hinted category comes first, then the remaining categories in [Category::ALL] order, each
/// with the identifier as given and with its `.json` suffix toggled, then `{identifier}.json` at
/// the bucket root. Duplicates are dropped, keeping the first occurrence.
pub fn candidate_keys(identifier: &str, hint: Category) -> Vec<String> {
    let alternate = match identifier.strip_suffix(".json") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        Some(_) => identifier.to_string(),
        None => format!("{}.json", identifier),
    };
    let root = if identifier.ends_with(".json") {
        identifier.to_string()
    } else {
        format!("{}.json", identifier)
    };
    let categories =
        std::iter::once(hint).chain(Category::ALL.into_iter().filter(|c| *c != hint));
    let mut candidates: Vec<String> = Vec::new();
    for category in categories {
        for name in [identifier, alternate.as_str()] {
            let key = format!("{}/{}", category, name);
            if !candidates.contains(&key) {
                candidates.push(key);
            }
        }
    }
    if !candidates.contains(&root) {
        candidates.push(root);
    }
    candidates
}

/// Resolves identifiers to object keys against a store.
pub struct Resolver<'a> {
    store: &'a dyn ObjectStore,
    max_keys: i32,
}

impl<'a> Resolver<'a> {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `store`: Object store to probe
    /// * `max_keys`: Page size bound for prefix scans
    pub fn new(store: &'a dyn ObjectStore, max_keys: i32) -> Self {
        Self { store, max_keys }
    }

    /// Resolve an identifier to the key of an existing object.
    ///
    /// # Arguments
    ///
    /// * `identifier`: Bare file name supplied by the client
    /// * `hint`: Category to try first. Defaults to the category in a timestamped name, or raw data.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn resolve(
        &self,
        identifier: &str,
        hint: Option<Category>,
    ) -> Result<String, AirwatchError> {
        validate_identifier(identifier)?;
        let start = Instant::now();
        let mut attempted: Vec<String> = Vec::new();

        let timestamped = TimestampedName::parse(identifier);
        if let Some(name) = &timestamped {
            let key = name.key(identifier);
            if self.store.head_object(&key).await? {
                tracing::debug!(
                    key = %key,
                    strategy = "pattern",
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "resolved file"
                );
                return Ok(key);
            }
            attempted.push(key);
        }

        let hint = hint
            .or_else(|| timestamped.as_ref().map(|name| name.category))
            .unwrap_or_default();
        for key in candidate_keys(identifier, hint) {
            if attempted.contains(&key) {
                continue;
            }
            if self.store.head_object(&key).await? {
                tracing::debug!(
                    key = %key,
                    strategy = "candidates",
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "resolved file"
                );
                return Ok(key);
            }
            attempted.push(key);
        }

        if timestamped.is_none() {
            let categories =
                std::iter::once(hint).chain(Category::ALL.into_iter().filter(|c| *c != hint));
            for category in categories {
                let prefix = category.prefix();
                if let Some(key) = self.scan(&prefix, identifier).await? {
                    tracing::debug!(
                        key = %key,
                        strategy = "scan",
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "resolved file"
                    );
                    return Ok(key);
                }
                attempted.push(format!("{}**/{}", prefix, identifier));
            }
        }

        tracing::debug!(
            identifier,
            attempts = attempted.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "file not found"
        );
        Err(AirwatchError::FileNotFound {
            identifier: identifier.to_string(),
            attempted,
        })
    }

    /// List one page under `prefix` and return the first key whose file name is `name`.
    ///
    /// # Arguments
    ///
    /// * `prefix`: Folder prefix to list
    /// * `name`: File name to look for
    pub async fn scan(&self, prefix: &str, name: &str) -> Result<Option<String>, AirwatchError> {
        let objects = self.store.list_objects(prefix, self.max_keys).await?;
        Ok(objects
            .into_iter()
            .map(|object| object.key)
            .find(|key| file_name(key) == name))
    }
}
