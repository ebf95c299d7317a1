// src/logging.rs

//! Tracing subscriber setup shared by binaries and tests

use crate::config::Settings;

/// Install the global tracing subscriber.
///
/// The `RUST_LOG` environment variable wins when set, otherwise the filter
/// from [`Settings`] applies. Calling this more than once is harmless, later
/// calls keep the subscriber already installed.
pub fn init(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_filter.clone()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
