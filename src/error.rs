//! Error handling.

use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_smithy_types::byte_stream::error::Error as ByteStreamError;
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{event, Level};

/// Airwatch server error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum AirwatchError {
    /// File identifier contains characters outside `[A-Za-z0-9._-]`
    #[error("invalid file identifier {identifier:?}")]
    InvalidIdentifier { identifier: String },

    /// Date string is not a valid `YYYYMMDD` calendar date
    #[error("invalid date {date:?}, expected YYYYMMDD")]
    InvalidDate { date: String },

    /// Date range is reversed or too long
    #[error("invalid date range {start} to {end}: {reason}")]
    InvalidDateRange {
        start: String,
        end: String,
        reason: &'static str,
    },

    /// Category name is not one of the known data categories
    #[error("unknown category {category:?}")]
    UnknownCategory { category: String },

    /// No resolution strategy found the requested file
    #[error("file {identifier} not found")]
    FileNotFound {
        identifier: String,
        attempted: Vec<String>,
    },

    /// A folder contains no data files
    #[error("no files found under {prefix}")]
    NoFiles { prefix: String },

    /// A resolved object vanished before it could be read
    #[error("object {key} not found")]
    ObjectNotFound { key: String },

    /// Object body is zero length
    #[error("object {key} is empty")]
    EmptyObject { key: String },

    /// Object body is not UTF-8 text
    #[error("object {key} is not valid UTF-8 text")]
    NotUtf8 {
        key: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// Object body is neither a JSON document nor newline-delimited JSON
    #[error("object {key} is neither JSON ({document}) nor NDJSON (line {line}: {line_error})")]
    Parse {
        key: String,
        document: serde_json::Error,
        line: usize,
        line_error: serde_json::Error,
    },

    /// Payload shape cannot be reduced as requested
    #[error("unsupported payload format: {reason}")]
    UnsupportedFormat { reason: &'static str },

    /// An external call exceeded its time bound
    #[error("{operation} timed out after {limit:?}")]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    /// Error deserialising a request body
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating a request body
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error deserialising query parameters
    #[error("query parameters are not valid")]
    QueryRejection(#[from] QueryRejection),

    /// Error reading object data from S3
    #[error("error receiving object from S3 storage")]
    S3ByteStream(#[from] ByteStreamError),

    /// Error while retrieving an object from S3
    #[error("error retrieving object from S3 storage")]
    S3GetObject(#[from] SdkError<GetObjectError>),

    /// Error while checking for an object in S3
    #[error("error checking object in S3 storage")]
    S3HeadObject(#[from] SdkError<HeadObjectError>),

    /// Error while listing objects in S3
    #[error("error listing objects in S3 storage")]
    S3ListObjects(#[from] SdkError<ListObjectsV2Error>),

    /// Dashboard embedding is not configured
    #[error("dashboards are not configured")]
    DashboardsDisabled,

    /// No dashboard matches the requested category
    #[error("no dashboard found for {category}")]
    NoDashboard { category: String },

    /// Error calling the dashboard service
    #[error("error calling dashboard service")]
    QuickSight(#[from] aws_sdk_quicksight::Error),

    /// Error building a dashboard service request
    #[error("error building dashboard service request")]
    QuickSightBuild(#[from] aws_sdk_quicksight::error::BuildError),

    /// The question-answering helper is not configured
    #[error("chat helper is not configured")]
    ChatDisabled,

    /// Error spawning or waiting for the question-answering helper
    #[error("failed to run chat helper")]
    ChatSpawn(#[from] std::io::Error),

    /// The question-answering helper ran but produced no usable answer
    #[error("chat helper failed: {reason}")]
    ChatFailed { reason: String },
}

/// Await `future`, failing with [AirwatchError::Timeout] if it does not complete within `limit`.
///
/// Dropping the future on timeout releases anything it owns, including child processes spawned
/// with `kill_on_drop`.
pub async fn with_timeout<T, E, F>(
    operation: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, AirwatchError>
where
    F: Future<Output = Result<T, E>>,
    AirwatchError: From<E>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(AirwatchError::from),
        Err(_) => Err(AirwatchError::Timeout {
            operation,
            limit,
        }),
    }
}

impl IntoResponse for AirwatchError {
    /// Convert from an `AirwatchError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,

    /// Object keys tried before giving up
    #[serde(skip_serializing_if = "Option::is_none")]
    attempted: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut caused_by = None;
        let mut current = error.source();
        while let Some(source) = current {
            let mut causes: Vec<String> = caused_by.unwrap_or_default();
            causes.push(source.to_string());
            caused_by = Some(causes);
            current = source.source();
        }
        // Remove duplicate entries.
        if let Some(caused_by) = caused_by.as_mut() {
            caused_by.dedup()
        }
        ErrorBody {
            message,
            caused_by,
            attempted: None,
        }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Return a 503 service unavailable ErrorResponse
    fn service_unavailable<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }

    /// Return a 504 gateway timeout ErrorResponse
    fn gateway_timeout<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::GATEWAY_TIMEOUT, error)
    }
}

/// Map a generic SDK failure onto a response. Store and dashboard failures are server faults, since
/// the credentials and locations involved are server configuration.
fn sdk_error_response<E, R>(sdk_error: &SdkError<E, R>, error: &AirwatchError) -> ErrorResponse {
    match sdk_error {
        SdkError::TimeoutError(_) => ErrorResponse::gateway_timeout(error),
        _ => ErrorResponse::internal_server_error(error),
    }
}

impl From<AirwatchError> for ErrorResponse {
    /// Convert from an `AirwatchError` into an `ErrorResponse`.
    fn from(error: AirwatchError) -> Self {
        let mut response = match &error {
            // Bad request
            AirwatchError::InvalidIdentifier { identifier: _ }
            | AirwatchError::InvalidDate { date: _ }
            | AirwatchError::InvalidDateRange { .. }
            | AirwatchError::UnknownCategory { category: _ }
            | AirwatchError::EmptyObject { key: _ }
            | AirwatchError::NotUtf8 { .. }
            | AirwatchError::Parse { .. }
            | AirwatchError::UnsupportedFormat { reason: _ }
            | AirwatchError::RequestDataJsonRejection(_)
            | AirwatchError::RequestDataValidation(_)
            | AirwatchError::QueryRejection(_) => Self::bad_request(&error),

            // Not found
            AirwatchError::FileNotFound { .. }
            | AirwatchError::NoFiles { prefix: _ }
            | AirwatchError::ObjectNotFound { key: _ }
            | AirwatchError::NoDashboard { category: _ } => Self::not_found(&error),

            // Service unavailable
            AirwatchError::DashboardsDisabled | AirwatchError::ChatDisabled => {
                Self::service_unavailable(&error)
            }

            // Gateway timeout
            AirwatchError::Timeout { .. } => Self::gateway_timeout(&error),

            // Internal server error
            AirwatchError::S3ByteStream(_)
            | AirwatchError::QuickSightBuild(_)
            | AirwatchError::ChatSpawn(_)
            | AirwatchError::ChatFailed { reason: _ } => Self::internal_server_error(&error),

            AirwatchError::S3GetObject(sdk_error) => match sdk_error {
                SdkError::ServiceError(get_obj_error) if get_obj_error.err().is_no_such_key() => {
                    Self::not_found(&error)
                }
                _ => sdk_error_response(sdk_error, &error),
            },
            AirwatchError::S3HeadObject(sdk_error) => sdk_error_response(sdk_error, &error),
            AirwatchError::S3ListObjects(sdk_error) => sdk_error_response(sdk_error, &error),

            AirwatchError::QuickSight(qs_error) => match qs_error {
                aws_sdk_quicksight::Error::ResourceNotFoundException(_) => Self::not_found(&error),
                _ => Self::internal_server_error(&error),
            },
        };

        if let AirwatchError::FileNotFound { attempted, .. } = &error {
            response.error.attempted = Some(attempted.clone());
        }

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
