//! Process-wide tracing/logging setup shared by the API binary and tests.

use tracing_subscriber::EnvFilter;

/// Output format for the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON lines, for production log shipping.
    Json,
    /// Human-readable output, for local development.
    Pretty,
}

impl LogFormat {
    /// Read `FIELDSTOCK_LOG_FORMAT` (`json` or `pretty`); defaults to JSON.
    pub fn from_env() -> Self {
        match std::env::var("FIELDSTOCK_LOG_FORMAT").as_deref() {
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Initialize tracing for the process.
///
/// Filtering comes from `RUST_LOG` (defaults to `info`). Safe to call
/// multiple times; subsequent calls are no-ops.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

/// Initialize with the format taken from the environment.
pub fn init_from_env() {
    init(LogFormat::from_env());
}
