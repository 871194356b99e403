//! Expansion of dates into the folder prefixes the store is partitioned by, and listing of those
//! prefixes.

use crate::error::AirwatchError;
use crate::latest::DATA_EXTENSION;
use crate::models::Category;
use crate::object_store::ObjectStore;

use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};

/// Longest range of days that may be listed in one request.
pub const MAX_RANGE_DAYS: i64 = 31;

/// Parse a strict `YYYYMMDD` calendar date.
pub fn parse_date(date: &str) -> Result<NaiveDate, AirwatchError> {
    let invalid = || AirwatchError::InvalidDate {
        date: date.to_string(),
    };
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| invalid())
}

/// Returns the `{category}/{YYYY}/{MM}/{DD}/` prefix of a day.
pub fn day_prefix(category: Category, day: NaiveDate) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/",
        category,
        day.year(),
        day.month(),
        day.day()
    )
}

/// Expand a date into its 24 hour prefixes, `00` to `23`.
///
/// # Arguments
///
/// * `category`: Category folder
/// * `date`: Date as `YYYYMMDD`
pub fn hour_prefixes(category: Category, date: &str) -> Result<Vec<String>, AirwatchError> {
    let day = day_prefix(category, parse_date(date)?);
    Ok((0..24).map(|hour| format!("{}{:02}/", day, hour)).collect())
}

/// Expand an inclusive range of dates into day prefixes.
///
/// # Arguments
///
/// * `category`: Category folder
/// * `start`: First date as `YYYYMMDD`
/// * `end`: Last date as `YYYYMMDD`. Defaults to `start`.
pub fn day_prefixes(
    category: Category,
    start: &str,
    end: Option<&str>,
) -> Result<Vec<String>, AirwatchError> {
    let first = parse_date(start)?;
    let last = match end {
        Some(end) => parse_date(end)?,
        None => first,
    };
    let invalid_range = |reason| AirwatchError::InvalidDateRange {
        start: start.to_string(),
        end: end.unwrap_or(start).to_string(),
        reason,
    };
    let days = (last - first).num_days() + 1;
    if days < 1 {
        return Err(invalid_range("end is before start"));
    }
    if days > MAX_RANGE_DAYS {
        return Err(invalid_range("range is longer than 31 days"));
    }
    Ok(first
        .iter_days()
        .take(days as usize)
        .map(|day| day_prefix(category, day))
        .collect())
}

/// List every prefix concurrently, at most `limit` at a time, and return the data file keys
/// found, sorted.
///
/// A failed listing is logged and contributes no keys; the other prefixes are unaffected. If every
/// listing fails, the first error is returned.
///
/// # Arguments
///
/// * `store`: Object store
/// * `prefixes`: Prefixes to list
/// * `max_keys`: Page size bound for each listing
/// * `limit`: Maximum number of listings in flight
pub async fn list_keys(
    store: &dyn ObjectStore,
    prefixes: &[String],
    max_keys: i32,
    limit: usize,
) -> Result<Vec<String>, AirwatchError> {
    let listing_futures: Vec<_> = prefixes
        .iter()
        .map(|prefix| async move {
            let result = store.list_objects(prefix, max_keys).await;
            if let Err(err) = &result {
                tracing::warn!(prefix = %prefix, error = %err, "failed to list bucket");
            }
            result
        })
        .collect();
    let listings: Vec<_> = stream::iter(listing_futures)
        .buffered(limit.max(1))
        .collect()
        .await;
    let mut keys = Vec::new();
    let mut first_error = None;
    let mut succeeded = false;
    for listing in listings {
        match listing {
            Ok(objects) => {
                succeeded = true;
                keys.extend(
                    objects
                        .into_iter()
                        .map(|object| object.key)
                        .filter(|key| key.ends_with(DATA_EXTENSION)),
                );
            }
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    if let (false, Some(err)) = (succeeded, first_error) {
        return Err(err);
    }
    keys.sort();
    keys.dedup();
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn parse_valid_date() {
        assert_eq!(
            NaiveDate::from_ymd_opt(2025, 8, 12).unwrap(),
            parse_date("20250812").unwrap()
        );
    }

    #[test]
    fn parse_invalid_dates() {
        for date in ["2025812", "2025-08-12", "20251301", "20250230", "+2025081", "abcdefgh"] {
            assert!(
                matches!(parse_date(date), Err(AirwatchError::InvalidDate { .. })),
                "{date}"
            );
        }
    }

    #[test]
    fn twenty_four_hours() {
        let prefixes = hour_prefixes(Category::RawData, "20250812").unwrap();
        assert_eq!(24, prefixes.len());
        assert_eq!("rawdata/2025/08/12/00/", prefixes[0]);
        assert_eq!("rawdata/2025/08/12/09/", prefixes[9]);
        assert_eq!("rawdata/2025/08/12/23/", prefixes[23]);
    }

    #[test]
    fn range_inclusive() {
        let prefixes = day_prefixes(Category::MinAvg, "20250830", Some("20250902")).unwrap();
        assert_eq!(
            vec![
                "minavg/2025/08/30/",
                "minavg/2025/08/31/",
                "minavg/2025/09/01/",
                "minavg/2025/09/02/",
            ],
            prefixes
        );
    }

    #[test]
    fn range_defaults_to_single_day() {
        assert_eq!(
            vec!["rawdata/2025/08/12/"],
            day_prefixes(Category::RawData, "20250812", None).unwrap()
        );
    }

    #[test]
    fn range_rejects_reversed_and_long() {
        assert!(matches!(
            day_prefixes(Category::RawData, "20250812", Some("20250811")),
            Err(AirwatchError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            day_prefixes(Category::RawData, "20250101", Some("20250301")),
            Err(AirwatchError::InvalidDateRange { .. })
        ));
        assert!(matches!(
            day_prefixes(Category::RawData, "20250101", Some("2025-03-01")),
            Err(AirwatchError::InvalidDate { .. })
        ));
    }

    #[tokio::test]
    async fn list_sorted_and_isolated() {
        let store = MemoryStore::new()
            .with_object("rawdata/2025/08/12/10/202508121000_rawdata.json", "[]", 0)
            .with_object("rawdata/2025/08/12/02/202508120200_rawdata.json", "[]", 0)
            .with_object("rawdata/2025/08/12/05/202508120500_rawdata.json", "[]", 0)
            .with_object("rawdata/2025/08/12/05/notes.txt", "", 0)
            .with_failing_prefix("rawdata/2025/08/12/05/");
        let prefixes = hour_prefixes(Category::RawData, "20250812").unwrap();
        let keys = list_keys(&store, &prefixes, 1000, 32).await.unwrap();
        assert_eq!(
            vec![
                "rawdata/2025/08/12/02/202508120200_rawdata.json",
                "rawdata/2025/08/12/10/202508121000_rawdata.json",
            ],
            keys
        );
        assert_eq!(24, store.calls().len());
    }

    #[tokio::test]
    async fn list_fails_when_every_prefix_fails() {
        let prefixes = hour_prefixes(Category::RawData, "20250812").unwrap();
        let store = prefixes.iter().fold(
            MemoryStore::new().with_object("rawdata/2025/08/12/10/202508121000_rawdata.json", "[]", 0),
            |store, prefix| store.with_failing_prefix(prefix),
        );
        let result = list_keys(&store, &prefixes, 1000, 32).await;
        assert!(matches!(
            result,
            Err(AirwatchError::Timeout {
                operation: "list objects",
                ..
            })
        ));
        assert_eq!(24, store.calls().len());
    }

    #[tokio::test]
    async fn list_no_prefixes() {
        let store = MemoryStore::new();
        assert_eq!(Vec::<String>::new(), list_keys(&store, &[], 1000, 32).await.unwrap());
    }

    #[tokio::test]
    async fn list_bounded() {
        let prefixes = hour_prefixes(Category::RawData, "20250812").unwrap();
        let store = MemoryStore::new();
        list_keys(&store, &prefixes, 1000, 4).await.unwrap();
        assert_eq!(4, store.peak_in_flight());
    }
}
