use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the tracing subscriber for the CLI binary.
///
/// `RUST_LOG` overrides `default_filter`. The library itself never installs
/// a subscriber.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
