//! This file defines the airwatch binary entry point.

use airwatch::app;
use airwatch::cli;
use airwatch::metrics;
use airwatch::server;
use airwatch::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::info!(bucket = %args.s3_bucket, port = args.port, "starting airwatch");
    metrics::register_metrics();
    let service = app::service(&args).await;
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
