use crate::cli::CommandLineArgs;
use crate::error::AirwatchError;
use crate::models::ObjectSummary;
use crate::object_store::ObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A store call recorded by [MemoryStore].
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum StoreCall {
    List(String),
    Get(String),
    Head(String),
}

/// In-memory [ObjectStore] that records every call made to it.
#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: BTreeMap<String, (Bytes, DateTime<Utc>)>,
    failing_keys: HashSet<String>,
    failing_prefixes: HashSet<String>,
    calls: Mutex<Vec<StoreCall>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add an object, modified `minute` minutes into 2025-08-12.
    pub(crate) fn with_object(mut self, key: &str, body: &str, minute: u32) -> Self {
        let modified = Utc
            .with_ymd_and_hms(2025, 8, 12, minute / 60, minute % 60, 0)
            .unwrap();
        self.objects
            .insert(key.to_string(), (Bytes::from(body.to_string()), modified));
        self
    }

    /// Make downloads of `key` fail.
    pub(crate) fn with_failing_key(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    /// Make listings of `prefix` fail.
    pub(crate) fn with_failing_prefix(mut self, prefix: &str) -> Self {
        self.failing_prefixes.insert(prefix.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of list and get calls that were in progress at once.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Hold the call open across one scheduler yield so that concurrent calls overlap.
    async fn in_flight(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn injected_failure(operation: &'static str) -> AirwatchError {
    AirwatchError::Timeout {
        operation,
        limit: Duration::ZERO,
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<ObjectSummary>, AirwatchError> {
        self.record(StoreCall::List(prefix.to_string()));
        self.in_flight().await;
        if self.failing_prefixes.contains(prefix) {
            return Err(injected_failure("list objects"));
        }
        Ok(self
            .objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(max_keys as usize)
            .map(|(key, (body, modified))| ObjectSummary {
                key: key.clone(),
                last_modified: Some(*modified),
                size: body.len() as i64,
            })
            .collect())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, AirwatchError> {
        self.record(StoreCall::Get(key.to_string()));
        self.in_flight().await;
        if self.failing_keys.contains(key) {
            return Err(injected_failure("get object"));
        }
        self.objects
            .get(key)
            .map(|(body, _)| body.clone())
            .ok_or_else(|| AirwatchError::ObjectNotFound {
                key: key.to_string(),
            })
    }

    async fn head_object(&self, key: &str) -> Result<bool, AirwatchError> {
        self.record(StoreCall::Head(key.to_string()));
        Ok(self.objects.contains_key(key))
    }
}

/// Command line arguments with only the required options set.
pub(crate) fn get_test_args() -> CommandLineArgs {
    CommandLineArgs::parse_from(["airwatch", "--s3-bucket", "sensors"])
}
