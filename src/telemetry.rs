//! Structured logging setup
//!
//! Every provider attempt, retry decision and final selection is logged
//! through `tracing` with the request id attached as a field.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Build the filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    format!("yatra_sevak={},tower_http=debug", level)
}

/// Install the global tracing subscriber
///
/// Only the first call has an effect. `RUST_LOG` overrides `default_level`
/// (normally `observability.log_level` from the config file).
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(default_level)));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    });
}
