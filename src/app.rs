//! Axum router and request handlers.

use crate::app_state::{AppState, SharedAppState};
use crate::buckets;
use crate::cli::CommandLineArgs;
use crate::dashboard::{embed_dashboard, DashboardCatalog, DashboardDetail, DashboardSummary};
use crate::error::AirwatchError;
use crate::fetcher::{fetch_and_parse, fetch_many};
use crate::latest::find_latest;
use crate::metrics::{metrics_handler, record_response_metrics, request_counter};
use crate::models::{
    file_name, Category, CategoryQuery, ChatRequest, FilesByDate, History, KeyRange, LastRecord,
    LatestFile, RangeQuery,
};
use crate::reducer::{history_entries, merge_by_filename, reduce, ReduceMode};
use crate::resolver::Resolver;
use crate::validated_json::ValidatedJson;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower::Layer;
use tower::ServiceBuilder;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Attach a `Cache-Control` header to a JSON response.
fn cached<T: Serialize>(max_age: u64, body: T) -> Response {
    (
        [(
            &header::CACHE_CONTROL,
            format!("public, max-age={}", max_age),
        )],
        Json(body),
    )
        .into_response()
}

/// Returns the category selected by an optional query parameter.
fn selected_category(
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<Category, AirwatchError> {
    let Query(query) = query?;
    Ok(query.category.unwrap_or_default())
}

/// Returns the dashboard catalog, or an error if dashboards are not configured.
fn catalog(state: &AppState) -> Result<&dyn DashboardCatalog, AirwatchError> {
    state
        .dashboards
        .as_deref()
        .ok_or(AirwatchError::DashboardsDisabled)
}

/// Returns a [axum::Router] for the service.
///
/// # Arguments
///
/// * `state`: Shared application state
pub fn router(state: SharedAppState) -> Router {
    fn files() -> Router<SharedAppState> {
        Router::new()
            .route("/latest/:category", get(latest))
            .route("/history/:date", get(history))
            .route("/by-name/:identifier", get(by_name))
            .route("/by-name/last/:identifier", get(by_name_last))
            .route("/by-date/:date", get(by_date))
            .route("/range", get(range))
    }

    Router::new()
        .nest("/files", files())
        .route("/dashboards", get(dashboards))
        .route("/dashboards/:category", get(dashboard))
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(request_counter)
                    .on_response(record_response_metrics),
            ),
        )
        .with_state(state)
}

/// The axum service type returned by [service].
pub type Service = NormalizePath<Router>;

/// Returns a [crate::app::Service] for the service.
///
/// The router is wrapped in a layer that trims trailing slashes from request paths.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub async fn service(args: &CommandLineArgs) -> Service {
    let state = Arc::new(AppState::new(args).await);
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

async fn health() -> &'static str {
    "OK"
}

/// Last record of the most recently modified file in a category.
async fn latest(
    State(state): State<SharedAppState>,
    Path(category): Path<String>,
) -> Result<Response, AirwatchError> {
    let category: Category = category.parse()?;
    let prefix = category.prefix();
    let object = find_latest(state.store.as_ref(), &prefix, state.args.s3_max_keys)
        .await?
        .ok_or(AirwatchError::NoFiles { prefix })?;
    let payload = fetch_and_parse(state.store.as_ref(), &object.key).await?;
    let body = LatestFile {
        filename: file_name(&object.key).to_string(),
        data: reduce(payload, ReduceMode::LastOnly)?,
    };
    Ok(cached(state.args.latest_max_age, body))
}

/// Every file of one day, newest first.
async fn history(
    State(state): State<SharedAppState>,
    Path(date): Path<String>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<Response, AirwatchError> {
    let category = selected_category(query)?;
    let prefixes = buckets::hour_prefixes(category, &date)?;
    let keys = buckets::list_keys(
        state.store.as_ref(),
        &prefixes,
        state.args.s3_max_keys,
        state.args.s3_connection_limit,
    )
    .await?;
    if keys.is_empty() {
        return Err(AirwatchError::NoFiles {
            prefix: buckets::day_prefix(category, buckets::parse_date(&date)?),
        });
    }
    let results = fetch_many(state.store.as_ref(), keys, state.args.s3_connection_limit).await;
    let files = history_entries(results);
    let body = History {
        date,
        total_files: files.len(),
        files,
    };
    Ok(cached(state.args.history_max_age, body))
}

/// Full payload of a file found by name.
async fn by_name(
    State(state): State<SharedAppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, AirwatchError> {
    let resolver = Resolver::new(state.store.as_ref(), state.args.s3_max_keys);
    let key = resolver.resolve(&identifier, None).await?;
    let payload = fetch_and_parse(state.store.as_ref(), &key).await?;
    Ok(Json(reduce(payload, ReduceMode::Full)?))
}

/// Final record of a file found by name.
async fn by_name_last(
    State(state): State<SharedAppState>,
    Path(identifier): Path<String>,
) -> Result<Json<LastRecord>, AirwatchError> {
    let resolver = Resolver::new(state.store.as_ref(), state.args.s3_max_keys);
    let key = resolver.resolve(&identifier, None).await?;
    let payload = fetch_and_parse(state.store.as_ref(), &key).await?;
    Ok(Json(LastRecord {
        data: reduce(payload, ReduceMode::LastOnly)?,
    }))
}

/// Every file of one day, keyed by file name.
async fn by_date(
    State(state): State<SharedAppState>,
    Path(date): Path<String>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<Response, AirwatchError> {
    let category = selected_category(query)?;
    let prefixes = buckets::hour_prefixes(category, &date)?;
    let keys = buckets::list_keys(
        state.store.as_ref(),
        &prefixes,
        state.args.s3_max_keys,
        state.args.s3_connection_limit,
    )
    .await?;
    let results = fetch_many(state.store.as_ref(), keys, state.args.s3_connection_limit).await;
    let files = merge_by_filename(results);
    let body = FilesByDate {
        date,
        total_files: files.len(),
        files,
    };
    Ok(cached(state.args.history_max_age, body))
}

/// Keys of the files in a range of days.
async fn range(
    State(state): State<SharedAppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Response, AirwatchError> {
    let Query(query) = query?;
    let category = query.category.unwrap_or_default();
    let prefixes = buckets::day_prefixes(category, &query.start, query.end.as_deref())?;
    let files = buckets::list_keys(
        state.store.as_ref(),
        &prefixes,
        state.args.s3_max_keys,
        state.args.s3_connection_limit,
    )
    .await?;
    let body = KeyRange {
        end: query.end.unwrap_or_else(|| query.start.clone()),
        start: query.start,
        total_files: files.len(),
        files,
    };
    Ok(cached(state.args.history_max_age, body))
}

async fn dashboards(
    State(state): State<SharedAppState>,
) -> Result<Json<Vec<DashboardSummary>>, AirwatchError> {
    Ok(Json(catalog(&state)?.list_dashboards().await?))
}

async fn dashboard(
    State(state): State<SharedAppState>,
    Path(category): Path<String>,
) -> Result<Json<DashboardDetail>, AirwatchError> {
    Ok(Json(embed_dashboard(catalog(&state)?, &category).await?))
}

async fn chat(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Result<Json<Value>, AirwatchError> {
    Ok(Json(state.chat.ask(&request.query).await?))
}
