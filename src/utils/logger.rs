use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// RUST_LOG wins over --verbose.
fn harness_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "registry_harness=debug,info"
        } else {
            "registry_harness=info"
        })
    })
}

/// Compact, human-readable output for interactive runs.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(harness_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

/// One JSON object per line, for CI log collectors.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(harness_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .json()
                .with_current_span(false),
        )
        .init();
}
