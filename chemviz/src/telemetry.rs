//! Tracing subscriber setup.
//!
//! Filtering follows `RUST_LOG` (default `info`). The output format comes from the `log_format`
//! config option:
//!
//! ```yaml
//! log_format: json   # pretty | compact | json
//! ```

use crate::config::LogFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).try_init()?,
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init()?,
    }

    info!(?format, "Telemetry initialized");
    Ok(())
}
