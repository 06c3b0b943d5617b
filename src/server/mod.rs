//! Server front-end (C5): UDP/TCP listeners, admission control, and the
//! read-only status views spec.md §6 exposes to operators.

pub mod concurrency;
pub mod dispatch;
pub mod rate_limit;
pub mod tcp;
pub mod udp;

pub use concurrency::ConcurrencyLimiter;
pub use dispatch::{DispatchOutcome, ServerContext};
pub use rate_limit::RateLimiter;
pub use tcp::serve_tcp;
pub use udp::serve_udp;

use serde::Serialize;

use crate::cache::CacheStatsSnapshot;
use crate::telemetry::TelemetryStatsSnapshot;

/// `server_stats()` view: aggregate request counters and latency
/// percentiles, independent of the cache's own statistics.
pub type ServerStats = TelemetryStatsSnapshot;

/// `cache_stats()` view: a direct re-export of the cache engine's snapshot.
pub type CacheStats = CacheStatsSnapshot;

/// `health()` view (spec.md §6): a minimal liveness/readiness summary, not
/// a full statistics dump.
#[derive(Clone, Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub in_flight_requests: usize,
    pub cache_entries: usize,
    pub uptime_seconds: f64,
}

impl ServerContext {
    pub async fn server_stats(&self) -> ServerStats {
        self.telemetry.stats_snapshot().await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats_snapshot().await
    }

    pub async fn recent_requests(
        &self,
        limit: usize,
        offset: usize,
        filters: &crate::telemetry::RecentFilters,
    ) -> Vec<crate::telemetry::RequestRecord> {
        self.telemetry.recent(limit, offset, filters).await
    }

    pub async fn health(&self) -> HealthStatus {
        let cache_stats = self.cache.stats_snapshot().await;
        HealthStatus {
            healthy: true,
            in_flight_requests: self.telemetry.in_flight_count().await,
            cache_entries: cache_stats.current_entries,
            uptime_seconds: cache_stats.uptime_seconds,
        }
    }
}
