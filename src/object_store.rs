//! Read-only object store interface.

use crate::error::AirwatchError;
use crate::models::ObjectSummary;

use async_trait::async_trait;
use bytes::Bytes;

/// Object store trait.
///
/// Defines the three read operations the service performs against the store. A single
/// implementation is constructed at startup and shared by every request.
///
/// # Methods
/// * `list_objects`: List up to `max_keys` objects under a prefix.
/// * `get_object`: Download the body of an object.
/// * `head_object`: Check whether an object exists without transferring its body.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects whose key starts with `prefix`.
    ///
    /// Only the first page is returned. Keys are in the store's lexicographic order.
    ///
    /// # Arguments
    ///
    /// * `prefix`: Key prefix, usually ending in `/`
    /// * `max_keys`: Page size bound
    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<ObjectSummary>, AirwatchError>;

    /// Download an object.
    ///
    /// Fails with [AirwatchError::ObjectNotFound] when the key does not exist.
    ///
    /// # Arguments
    ///
    /// * `key`: Object key
    async fn get_object(&self, key: &str) -> Result<Bytes, AirwatchError>;

    /// Returns true if the object exists.
    ///
    /// # Arguments
    ///
    /// * `key`: Object key
    async fn head_object(&self, key: &str) -> Result<bool, AirwatchError>;
}
