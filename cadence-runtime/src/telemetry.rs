use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};
use crate::error::BoxError;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.level`. Fails if a global
/// subscriber is already set.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
}
