use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::enums::{RecordType, Rcode};
use crate::telemetry::record::{RecentFilters, RequestRecord};

pub const DEFAULT_RING_CAPACITY: usize = 1000;
const DEFAULT_BROADCAST_CAPACITY: usize = 1024;
const RESPONSE_TIME_SAMPLE_CAPACITY: usize = 1000;

/// Which transport admitted the request, for the `total queries by
/// protocol` counter in spec.md §4.6.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
}

#[derive(Default)]
struct Counters {
    total_udp: u64,
    total_tcp: u64,
    cache_hits: u64,
    cache_misses: u64,
    errors_by_kind: HashMap<String, u64>,
}

struct TrackerState {
    in_flight: HashMap<Uuid, Instant>,
    ring: VecDeque<RequestRecord>,
    ring_capacity: usize,
    counters: Counters,
    response_times_ms: VecDeque<f64>,
}

/// Starts/ends per-request timing, maintains the bounded recent-request
/// ring, and fans out completed records to subscribers over a bounded
/// broadcast channel - a slow subscriber drops the oldest records for
/// itself rather than ever blocking the producer (spec.md §9).
pub struct RequestTracker {
    state: Mutex<TrackerState>,
    publisher: broadcast::Sender<RequestRecord>,
}

impl RequestTracker {
    pub fn new(ring_capacity: usize) -> Self {
        let (publisher, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        RequestTracker {
            state: Mutex::new(TrackerState {
                in_flight: HashMap::new(),
                ring: VecDeque::with_capacity(ring_capacity),
                ring_capacity,
                counters: Counters::default(),
                response_times_ms: VecDeque::with_capacity(RESPONSE_TIME_SAMPLE_CAPACITY),
            }),
            publisher,
        }
    }

    /// Allocates a request id and records the start time.
    pub async fn start_request(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.in_flight.insert(id, Instant::now());
        id
    }

    /// Completes a request: computes elapsed time, builds and stores a
    /// `RequestRecord`, publishes it, and updates the aggregate counters.
    #[allow(clippy::too_many_arguments)]
    pub async fn finish_request(
        &self,
        id: Uuid,
        protocol: Protocol,
        client_ip: IpAddr,
        query_type: RecordType,
        domain: String,
        response_code: Rcode,
        cache_hit: bool,
        upstream_server: Option<IpAddr>,
        response_data: Vec<String>,
        error: Option<String>,
    ) -> RequestRecord {
        let mut guard = self.state.lock().await;
        let started = guard.in_flight.remove(&id).unwrap_or_else(Instant::now);
        let elapsed_ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

        let record = RequestRecord {
            timestamp: Utc::now(),
            request_id: id,
            client_ip,
            query_type,
            domain,
            response_code,
            response_time_ms: elapsed_ms,
            cache_hit,
            upstream_server,
            response_data,
            error: error.clone(),
        };

        match protocol {
            Protocol::Udp => guard.counters.total_udp += 1,
            Protocol::Tcp => guard.counters.total_tcp += 1,
        }
        if cache_hit {
            guard.counters.cache_hits += 1;
        } else {
            guard.counters.cache_misses += 1;
        }
        if let Some(kind) = &error {
            *guard.counters.errors_by_kind.entry(kind.clone()).or_insert(0) += 1;
        }
        if guard.response_times_ms.len() == RESPONSE_TIME_SAMPLE_CAPACITY {
            guard.response_times_ms.pop_front();
        }
        guard.response_times_ms.push_back(elapsed_ms);

        if guard.ring.len() == guard.ring_capacity {
            guard.ring.pop_back();
        }
        guard.ring.push_front(record.clone());

        drop(guard);
        let _ = self.publisher.send(record.clone());
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestRecord> {
        self.publisher.subscribe()
    }

    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn recent(&self, limit: usize, offset: usize, filters: &RecentFilters) -> Vec<RequestRecord> {
        let guard = self.state.lock().await;
        guard
            .ring
            .iter()
            .filter(|record| filters.matches(record))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn stats_snapshot(&self) -> TelemetryStatsSnapshot {
        let guard = self.state.lock().await;
        let mut sorted: Vec<f64> = guard.response_times_ms.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("response times are never NaN"));

        TelemetryStatsSnapshot {
            total_queries_udp: guard.counters.total_udp,
            total_queries_tcp: guard.counters.total_tcp,
            cache_hits: guard.counters.cache_hits,
            cache_misses: guard.counters.cache_misses,
            errors_by_kind: guard.counters.errors_by_kind.clone(),
            ring_len: guard.ring.len(),
            p50_response_time_ms: percentile(&sorted, 0.50),
            p95_response_time_ms: percentile(&sorted, 0.95),
            p99_response_time_ms: percentile(&sorted, 0.99),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

#[derive(Clone, Debug)]
pub struct TelemetryStatsSnapshot {
    pub total_queries_udp: u64,
    pub total_queries_tcp: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors_by_kind: HashMap<String, u64>,
    pub ring_len: usize,
    pub p50_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
}
