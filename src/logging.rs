use crate::config::Config;
use crate::constants::LOG_FORMAT_ENV;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Logs go to stderr so stdout stays free for previews and JSON summaries.
/// `COGNIGROUP_LOG_FORMAT=json` (or `[logging].format = "json"`) switches
/// to JSON lines; `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(config: &Config) {
    let format = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .or_else(|| config.logging.format.clone())
        .unwrap_or_default();

    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    // try_init: tests and embedders may already have installed a subscriber
    let result = if format == "json" {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}
