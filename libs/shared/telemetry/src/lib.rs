// [libs/shared/telemetry/src/lib.rs]
//! Structured logging bootstrap and the Prometheus metrics recorder shared
//! by the worker and monitor binaries.

use std::panic;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a `tracing` subscriber: JSON in release builds, compact
/// human-readable output in debug builds. `RUST_LOG` overrides the default
/// per-target filter, which otherwise quiets `tower_http`/`hyper` to `warn`.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={default_level},tower_http=warn,hyper=warn").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }

    install_panic_hook(service_name);
}

fn install_panic_hook(service_name: &str) {
    let service_name = service_name.to_string();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("no panic message");
        error!(target: "panic", service = %service_name, location = %location, "{message}");
    }));
}

/// Builds and installs a process-global Prometheus recorder, returning a
/// handle that renders the exposition-format text for a `/metrics` endpoint.
/// Each worker or monitor process installs exactly one of these; tests that
/// need isolated counters should build their own `PrometheusBuilder` without
/// installing it globally and read through the returned handle directly.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus recorder must install exactly once per process")
}
