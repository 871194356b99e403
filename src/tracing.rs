//! Tracing (logging)

use crate::cli::CommandLineArgs;

use opentelemetry::global;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable debug
/// logging for this crate and tower_http if not set. Spans are also exported to Jaeger when
/// enabled.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn init_tracing(args: &CommandLineArgs) {
    let jaeger = if args.enable_jaeger {
        global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name("airwatch")
            .install_simple()
            .expect("Failed to initialise Jaeger tracer");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(jaeger)
        .init();
}

/// Flush and shut down any trace exporter.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}
