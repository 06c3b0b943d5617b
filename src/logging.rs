//! Logging setup (ambient stack, not part of spec.md's scope: "logging
//! transport and rotation... delegated"). Builds a `tracing-subscriber`
//! registry with two independent layers:
//!
//! - a human-readable layer at the configured `log_level`, carrying every
//!   event except the dedicated query-log stream;
//! - a JSON-lines layer that carries only the `query_log` target (spec.md
//!   §6's "successful-query log stream"), so a deployment can route it to
//!   its own sink without the core ever touching a file handle.
//!
//! Formatting, file rotation, and shipping either stream anywhere beyond
//! stdout/stderr is left to whatever collects the process's output - this
//! module only decides what goes to which stream and at what level.

use tracing_subscriber::filter::{FilterFn, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::telemetry::QUERY_LOG_TARGET;

/// Installs the global subscriber. Call once, at process startup, before
/// any other component logs anything.
pub fn init(log_level: &str) {
    let level_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let general_layer = fmt::layer()
        .with_target(true)
        .with_filter(level_filter)
        .with_filter(FilterFn::new(|metadata| metadata.target() != QUERY_LOG_TARGET));

    let query_log_layer = fmt::layer()
        .json()
        .with_target(false)
        .with_level(false)
        .without_time()
        .with_filter(LevelFilter::INFO)
        .with_filter(FilterFn::new(|metadata| metadata.target() == QUERY_LOG_TARGET));

    tracing_subscriber::registry()
        .with(general_layer)
        .with(query_log_layer)
        .init();
}
