//! This crate provides the backend of an air quality dashboard. It serves time-bucketed sensor
//! reading files from an S3 bucket, laid out as `{category}/{year}/{month}/{day}/{hour}/`, and
//! returns the latest reading, a single file, or every file of a day as JSON.
//!
//! Files are either a single JSON document or newline-delimited JSON. A file may be requested by
//! a bare name; the [resolver] finds its key by parsing the timestamp embedded in the name,
//! probing a list of candidate keys, and finally scanning the category folders.
//!
//! The server also proxies two collaborators:
//!
//! * Amazon QuickSight, for listing dashboards and generating anonymous embed URLs
//!   ([dashboard]).
//! * A local question-answering script, run as a subprocess with a time limit ([chat]).
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team, on top of the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [AWS SDK for S3](aws-sdk-s3) is used to interact with S3-compatible object stores.

pub mod app;
pub mod app_state;
pub mod buckets;
pub mod chat;
pub mod cli;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod latest;
pub mod metrics;
pub mod models;
pub mod object_store;
pub mod reducer;
pub mod resolver;
pub mod s3_client;
pub mod server;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
