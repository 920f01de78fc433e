use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Filter from `RUST_LOG`, falling back to `default` when unset or invalid
fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the JSON subscriber on stdout.
///
/// `log` records from actix and the request logger are bridged through
/// `tracing-subscriber`'s default `tracing-log` integration.
pub fn init_telemetry() {
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .json();

    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(formatting_layer)
        .init();
}
