//! A simplified S3 client that supports listing, checking and downloading objects.
//! It attempts to hide the complexities of working with the AWS SDK for S3.

use crate::cli::CommandLineArgs;
use crate::error::{with_timeout, AirwatchError};
use crate::metrics::STORE_CALLS;
use crate::models::ObjectSummary;
use crate::object_store::ObjectStore;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use aws_types::SdkConfig;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// S3 credentials supplied on the command line.
#[derive(Clone, Eq, PartialEq)]
pub enum S3Credentials {
    AccessKey {
        access_key: String,
        secret_key: String,
    },
    /// Use the default AWS credential chain.
    Default,
}

impl S3Credentials {
    /// Create an access key credential.
    pub fn access_key(access_key: &str, secret_key: &str) -> Self {
        S3Credentials::AccessKey {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Select credentials from command line arguments.
    pub fn from_args(args: &CommandLineArgs) -> Self {
        match (&args.s3_access_key, &args.s3_secret_key) {
            (Some(access_key), Some(secret_key)) => Self::access_key(access_key, secret_key),
            _ => Self::Default,
        }
    }
}

/// S3 client object.
///
/// The underlying [aws_sdk_s3::Client] is relatively expensive to create, so one is built at
/// startup and cloned cheaply thereafter.
#[derive(Clone)]
pub struct S3Client {
    /// Underlying AWS SDK S3 client object.
    client: Client,
    /// Bucket holding the sensor data.
    bucket: String,
    /// Bound on each store call.
    timeout: Duration,
}

impl S3Client {
    /// Creates an S3Client object
    ///
    /// # Arguments
    ///
    /// * `sdk_config`: Shared AWS configuration (region, default credentials)
    /// * `args`: Command line arguments
    pub fn new(sdk_config: &SdkConfig, args: &CommandLineArgs) -> Self {
        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).behavior_version(BehaviorVersion::latest());
        if let Some(url) = &args.s3_endpoint {
            builder = builder.endpoint_url(url.to_string()).force_path_style(true);
        }
        if let S3Credentials::AccessKey {
            access_key,
            secret_key,
        } = S3Credentials::from_args(args)
        {
            let credentials = Credentials::from_keys(access_key, secret_key, None);
            builder = builder.credentials_provider(credentials);
        }
        Self {
            client: Client::from_conf(builder.build()),
            bucket: args.s3_bucket.clone(),
            timeout: Duration::from_secs(args.s3_timeout),
        }
    }
}

/// Record the outcome of one store call.
fn record_call<T>(operation: &str, result: &Result<T, AirwatchError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(AirwatchError::Timeout { .. }) => "timeout",
        Err(_) => "error",
    };
    STORE_CALLS.with_label_values(&[operation, outcome]).inc();
}

#[async_trait]
impl ObjectStore for S3Client {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn list_objects(
        &self,
        prefix: &str,
        max_keys: i32,
    ) -> Result<Vec<ObjectSummary>, AirwatchError> {
        let start = Instant::now();
        let request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .instrument(tracing::Span::current());
        let result = with_timeout("list objects", self.timeout, request).await;
        record_call("list", &result);
        let output = result?;
        let objects: Vec<ObjectSummary> = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectSummary {
                    key: object.key()?.to_string(),
                    last_modified: object
                        .last_modified()
                        .and_then(|time| time.to_chrono_utc().ok()),
                    size: object.size().unwrap_or_default(),
                })
            })
            .collect();
        tracing::debug!(
            objects = objects.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "listed prefix"
        );
        Ok(objects)
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn get_object(&self, key: &str) -> Result<Bytes, AirwatchError> {
        let start = Instant::now();
        let download = async {
            let response = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .instrument(tracing::Span::current())
                .await
            {
                Ok(response) => response,
                Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => {
                    return Err(AirwatchError::ObjectNotFound {
                        key: key.to_string(),
                    })
                }
                Err(err) => return Err(err.into()),
            };
            let data = response.body.collect().await?;
            Ok::<Bytes, AirwatchError>(data.into_bytes())
        };
        let result = with_timeout("get object", self.timeout, download).await;
        record_call("get", &result);
        if let Ok(bytes) = &result {
            tracing::debug!(
                bytes = bytes.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "downloaded object"
            );
        }
        result
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn head_object(&self, key: &str) -> Result<bool, AirwatchError> {
        let probe = async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .instrument(tracing::Span::current())
                .await
            {
                Ok(_) => Ok(true),
                Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(false),
                Err(err) => Err(AirwatchError::from(err)),
            }
        };
        let result = with_timeout("head object", self.timeout, probe).await;
        record_call("head", &result);
        result
    }
}
