//! Per-request tracking, recent-query history, and the successful-query
//! log stream (C6).

pub mod query_log;
pub mod record;
pub mod tracker;

pub use query_log::{log_successful_query, QUERY_LOG_TARGET};
pub use record::{RecentFilters, RequestRecord};
pub use tracker::{Protocol, RequestTracker, TelemetryStatsSnapshot, DEFAULT_RING_CAPACITY};
