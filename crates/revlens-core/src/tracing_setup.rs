use std::fs::OpenOptions;

use anyhow::Context;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use parking_lot::Mutex;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::constants::{env, SERVICE_NAME};

// Kept so shutdown_tracing() can flush pending spans
static PROVIDER: Mutex<Option<SdkTracerProvider>> = parking_lot::const_mutex(None);

pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Install the global subscriber.
///
/// The level filter comes from `REVLENS_LOG` (falling back to `default_directive`).
/// When `REVLENS_LOG_FILE` is set, output goes to that file instead of stderr,
/// so a full-screen frontend does not get its display overwritten.
/// When `REVLENS_OTLP_ENDPOINT` is set, spans are also exported there over
/// OTLP/HTTP.
pub fn init_tracing_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_env(env::LOG)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let output = output_layer(filter);

    let telemetry = std::env::var(env::OTLP_ENDPOINT)
        .ok()
        .filter(|endpoint| !endpoint.is_empty())
        .and_then(|endpoint| match otlp_provider(&endpoint) {
            Ok(provider) => {
                opentelemetry::global::set_tracer_provider(provider.clone());
                let tracer = provider.tracer(SERVICE_NAME);
                *PROVIDER.lock() = Some(provider);
                Some(
                    tracing_opentelemetry::layer()
                        .with_tracer(tracer)
                        .with_filter(LevelFilter::INFO),
                )
            }
            Err(e) => {
                eprintln!("Failed to set up span export to {endpoint}: {e:#}");
                None
            }
        });

    // A subscriber may already be installed (tests, embedding frontends)
    let _ = tracing_subscriber::registry()
        .with(output)
        .with(telemetry)
        .try_init();
}

/// Shutdown the tracer provider, flushing any pending spans
pub fn shutdown_tracing() {
    if let Some(provider) = PROVIDER.lock().take() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Failed to flush spans: {e}");
        }
    }
}

fn output_layer(filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync> {
    if let Ok(log_path) = std::env::var(env::LOG_FILE) {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                return fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_filter(filter)
                    .boxed();
            }
            Err(e) => {
                eprintln!("Failed to open log file {log_path}: {e}, logging to stderr");
            }
        }
    }

    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(filter)
        .boxed()
}

fn otlp_provider(endpoint: &str) -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    let resource = Resource::builder().with_service_name(SERVICE_NAME).build();

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}
