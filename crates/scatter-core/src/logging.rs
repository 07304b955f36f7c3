use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{ConfigError, LoggingConfig, Result, ScatterError};

const CRATES: [&str; 4] = [
    "scatter_core",
    "scatter_graph",
    "scatter_cache",
    "scatter_factory",
];

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
///
/// Returns an error when a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        CRATES
            .iter()
            .map(|c| format!("{}={}", c, config.level))
            .collect::<Vec<_>>()
            .join(",")
            .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format.as_str() {
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
        "full" => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    installed.map_err(|e| {
        ScatterError::Config(ConfigError::ValidationError(format!(
            "tracing subscriber already installed: {}",
            e
        )))
    })
}
