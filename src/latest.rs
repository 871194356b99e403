//! Selection of the most recently written file in a folder.

use crate::error::AirwatchError;
use crate::models::ObjectSummary;
use crate::object_store::ObjectStore;

/// Extension of data files.
pub const DATA_EXTENSION: &str = ".json";

/// Find the most recently modified data file under `prefix`.
///
/// Only the first listing page is considered. Returns `Ok(None)` when the folder holds no data
/// files, which is normal before the first upload. Objects without a modification time are
/// treated as oldest.
///
/// # Arguments
///
/// * `store`: Object store
/// * `prefix`: Folder prefix
/// * `max_keys`: Page size bound
#[tracing::instrument(level = "DEBUG", skip(store))]
pub async fn find_latest(
    store: &dyn ObjectStore,
    prefix: &str,
    max_keys: i32,
) -> Result<Option<ObjectSummary>, AirwatchError> {
    let objects = store.list_objects(prefix, max_keys).await?;
    let latest = objects
        .into_iter()
        .filter(|object| object.key.ends_with(DATA_EXTENSION))
        .max_by_key(|object| object.last_modified);
    match &latest {
        Some(object) => tracing::debug!(key = %object.key, "found latest file"),
        None => tracing::debug!("no data files"),
    }
    Ok(latest)
}
