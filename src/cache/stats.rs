use std::collections::VecDeque;
use std::time::Instant;

const LOOKUP_HISTORY_CAPACITY: usize = 1000;

/// Why an entry was removed, used to bucket the eviction counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvictionReason {
    Lru,
    Ttl,
    Memory,
    Manual,
}

/// Lock-protected cache statistics, updated alongside the cache map under
/// the same mutex (spec.md §4.2 allows "atomic counters or lock-protected").
#[derive(Debug)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub negative_hits: u64,
    pub current_entries: usize,
    pub max_entries_reached: usize,
    pub current_memory_bytes: usize,
    pub max_memory_bytes: usize,
    pub lru_evictions: u64,
    pub ttl_expirations: u64,
    pub memory_evictions: u64,
    pub manual_evictions: u64,
    lookup_times_ms: VecDeque<f64>,
    start_time: Instant,
}

impl CacheStats {
    pub fn new(now: Instant) -> Self {
        CacheStats {
            total_requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            negative_hits: 0,
            current_entries: 0,
            max_entries_reached: 0,
            current_memory_bytes: 0,
            max_memory_bytes: 0,
            lru_evictions: 0,
            ttl_expirations: 0,
            memory_evictions: 0,
            manual_evictions: 0,
            lookup_times_ms: VecDeque::with_capacity(LOOKUP_HISTORY_CAPACITY),
            start_time: now,
        }
    }

    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_hit(&mut self, lookup_time_ms: f64, is_negative: bool) {
        self.cache_hits += 1;
        if is_negative {
            self.negative_hits += 1;
        }
        self.record_lookup_time(lookup_time_ms);
    }

    pub fn record_miss(&mut self, lookup_time_ms: f64) {
        self.cache_misses += 1;
        self.record_lookup_time(lookup_time_ms);
    }

    fn record_lookup_time(&mut self, lookup_time_ms: f64) {
        if self.lookup_times_ms.len() == LOOKUP_HISTORY_CAPACITY {
            self.lookup_times_ms.pop_front();
        }
        self.lookup_times_ms.push_back(lookup_time_ms);
    }

    pub fn record_eviction(&mut self, reason: EvictionReason) {
        match reason {
            EvictionReason::Lru => self.lru_evictions += 1,
            EvictionReason::Ttl => self.ttl_expirations += 1,
            EvictionReason::Memory => self.memory_evictions += 1,
            EvictionReason::Manual => self.manual_evictions += 1,
        }
    }

    pub fn total_evictions(&self) -> u64 {
        self.lru_evictions + self.ttl_expirations + self.memory_evictions + self.manual_evictions
    }

    pub fn update_size(&mut self, entries: usize, memory_bytes: usize) {
        self.current_entries = entries;
        self.current_memory_bytes = memory_bytes;
        self.max_entries_reached = self.max_entries_reached.max(entries);
        self.max_memory_bytes = self.max_memory_bytes.max(memory_bytes);
    }

    pub fn hit_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }

    pub fn average_lookup_time_ms(&self) -> f64 {
        if self.lookup_times_ms.is_empty() {
            0.0
        } else {
            self.lookup_times_ms.iter().sum::<f64>() / self.lookup_times_ms.len() as f64
        }
    }

    pub fn uptime(&self, now: Instant) -> std::time::Duration {
        now.duration_since(self.start_time)
    }
}
