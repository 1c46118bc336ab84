use std::env;

use tracing_subscriber::EnvFilter;

const CI_VAR: &str = "CI";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines, filtered by `RUST_LOG`.
    Text,
    /// One JSON object per event, with the current span.
    Json,
}

impl LogFormat {
    /// JSON on CI runners, text otherwise.
    pub fn from_env() -> LogFormat {
        match env::var_os(CI_VAR) {
            Some(_) => LogFormat::Json,
            None => LogFormat::Text,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber. Calling it more than once is harmless, later calls are ignored.
pub fn init(format: LogFormat) {
    let result = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if result.is_ok() {
        debug!("logger initialized with {:?} format", format);
    }
}
