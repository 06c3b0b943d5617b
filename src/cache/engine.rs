use std::time::Instant;

use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::cache::entry::{CacheEntry, EntryKind};
use crate::cache::key::CacheKey;
use crate::cache::stats::{CacheStats, EvictionReason};
use crate::codec::{DnsMessage, Question};
use crate::enums::Rcode;

/// Configuration a cache is built with. Immutable for the lifetime of the
/// engine, matching the original implementation's `__init__`-only knobs.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub max_size: usize,
    pub max_memory_bytes: usize,
    pub default_ttl: u32,
    pub min_ttl: u32,
    pub max_ttl: u32,
    pub negative_ttl: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_size: 10_000,
            max_memory_bytes: 100 * 1024 * 1024,
            default_ttl: 300,
            min_ttl: 1,
            max_ttl: 86_400,
            negative_ttl: 300,
        }
    }
}

/// A response served from the cache, along with whether it was a negative
/// (NXDOMAIN / empty-NOERROR) entry - telemetry reports `cache_hit=true`
/// with the original response code either way.
#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub response: DnsMessage,
    pub negative: bool,
}

/// Entries are kept in access order, oldest-first, exactly the way the
/// Python original keeps its `OrderedDict` and calls `move_to_end` on every
/// hit: the front of the map is always the next LRU eviction candidate.
struct CacheInner {
    entries: IndexMap<CacheKey, CacheEntry>,
    current_memory: usize,
    stats: CacheStats,
}

impl CacheInner {
    /// Step 1 of eviction ordering: drop any already-expired entry found
    /// while examining the map. Counted as TTL expirations regardless of
    /// which operation triggered the scan.
    fn evict_expired(&mut self, now: Instant) {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            self.remove(&key, EvictionReason::Ttl);
        }
    }

    /// Step 2: while over the entry-count cap, evict the least-recently-used,
    /// which is always the front of the map.
    fn enforce_size_limit(&mut self, max_size: usize) {
        while self.entries.len() >= max_size {
            let victim = self.entries.first().map(|(key, _)| key.clone());
            match victim {
                Some(key) => self.remove(&key, EvictionReason::Lru),
                None => break,
            }
        }
    }

    /// Step 3: while over the memory cap, evict the largest entry; ties
    /// broken by older `last_accessed`.
    fn enforce_memory_limit(&mut self, max_memory_bytes: usize) {
        while self.current_memory > max_memory_bytes && self.entries.len() > 1 {
            let victim = self
                .entries
                .iter()
                .max_by(|(_, a), (_, b)| {
                    a.memory_estimate
                        .cmp(&b.memory_estimate)
                        .then(b.last_accessed.cmp(&a.last_accessed))
                })
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => self.remove(&key, EvictionReason::Memory),
                None => break,
            }
        }
    }

    /// Moves `key` to the back of the map, marking it most-recently-used.
    fn touch(&mut self, key: &CacheKey) {
        self.entries.move_index(
            self.entries.get_index_of(key).expect("key was just looked up"),
            self.entries.len() - 1,
        );
    }

    fn remove(&mut self, key: &CacheKey, reason: EvictionReason) {
        if let Some(entry) = self.entries.shift_remove(key) {
            self.current_memory = self.current_memory.saturating_sub(entry.memory_estimate);
            self.stats.record_eviction(reason);
            self.stats.update_size(self.entries.len(), self.current_memory);
        }
    }

    fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        if let Some(old) = self.entries.shift_remove(&key) {
            self.current_memory = self.current_memory.saturating_sub(old.memory_estimate);
        }
        self.current_memory += entry.memory_estimate;
        self.entries.insert(key, entry);
        self.stats.update_size(self.entries.len(), self.current_memory);
    }
}

/// LRU + TTL + memory-bound store, guarded by a single async mutex per
/// spec.md §5's shared-resource policy. Critical sections never perform I/O.
pub struct CacheEngine {
    config: CacheConfig,
    inner: Mutex<CacheInner>,
}

impl CacheEngine {
    pub fn new(config: CacheConfig) -> Self {
        CacheEngine {
            config,
            inner: Mutex::new(CacheInner {
                entries: IndexMap::new(),
                current_memory: 0,
                stats: CacheStats::new(Instant::now()),
            }),
        }
    }

    #[instrument(skip(self, question))]
    pub async fn get(&self, question: &Question) -> Option<CachedResponse> {
        let key = CacheKey::from_question(question);
        let start = Instant::now();
        let mut guard = self.inner.lock().await;
        guard.stats.record_request();

        if !guard.entries.contains_key(&key) {
            guard.stats.record_miss(start.elapsed().as_secs_f64() * 1000.0);
            return None;
        }

        let now = Instant::now();
        if guard.entries.get(&key).expect("just checked").is_expired(now) {
            guard.remove(&key, EvictionReason::Ttl);
            guard.stats.record_miss(start.elapsed().as_secs_f64() * 1000.0);
            return None;
        }

        let entry = guard.entries.get_mut(&key).expect("just checked");
        entry.record_access(now);
        let remaining_ttl = entry.remaining_ttl(now);
        let negative = matches!(entry.entry_kind, EntryKind::Negative);
        let mut response = entry.response.clone();
        guard.touch(&key);
        for record in response
            .answers
            .iter_mut()
            .chain(&mut response.authority)
            .chain(&mut response.additional)
        {
            *record = record.with_ttl(remaining_ttl);
        }

        guard.stats.record_hit(start.elapsed().as_secs_f64() * 1000.0, negative);
        Some(CachedResponse { response, negative })
    }

    #[instrument(skip(self, question, response))]
    pub async fn put(&self, question: &Question, mut response: DnsMessage) {
        let key = CacheKey::from_question(question);
        let is_negative = matches!(response.header.rcode, Rcode::NameError)
            || (matches!(response.header.rcode, Rcode::NoError) && response.answers.is_empty());

        // The OPT pseudo-RR's "ttl" field is really extended-RCODE/flag bits,
        // not a cacheable lifetime, and it describes the upstream transaction
        // rather than this entry - never store it.
        response
            .additional
            .retain(|rr| !matches!(rr.record_type, crate::enums::RecordType::OPT));

        let now = Instant::now();
        let entry = if is_negative {
            CacheEntry::new(response, self.config.negative_ttl, EntryKind::Negative, now)
        } else {
            let ttl = Self::calculate_ttl(
                &response,
                self.config.default_ttl,
                self.config.min_ttl,
                self.config.max_ttl,
            );
            CacheEntry::new(response, ttl, EntryKind::Positive, now)
        };

        let mut guard = self.inner.lock().await;
        guard.evict_expired(now);
        guard.enforce_size_limit(self.config.max_size);
        guard.insert(key, entry);
        guard.enforce_memory_limit(self.config.max_memory_bytes);
    }

    /// TTL is the minimum across answer RRs, falling back to `default_ttl`
    /// when there are none to derive it from, clamped to `[min_ttl, max_ttl]`.
    fn calculate_ttl(response: &DnsMessage, default_ttl: u32, min_ttl: u32, max_ttl: u32) -> u32 {
        let ttl = response.answers.iter().map(|rr| rr.ttl).min().unwrap_or(default_ttl);
        ttl.clamp(min_ttl, max_ttl)
    }

    /// Removes all entries whose key matches `domain` case-insensitively
    /// and, when `qtype` is given, matches its numeric type exactly.
    pub async fn invalidate(&self, domain: &str, qtype: Option<u16>) -> usize {
        let domain = domain.to_ascii_lowercase();
        let mut guard = self.inner.lock().await;
        let keys: Vec<CacheKey> = guard
            .entries
            .keys()
            .filter(|key| key.name == domain && qtype.map(|t| t == key.qtype).unwrap_or(true))
            .cloned()
            .collect();
        let count = keys.len();
        for key in keys {
            guard.remove(&key, EvictionReason::Manual);
        }
        count
    }

    pub async fn flush(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let count = guard.entries.len();
        guard.entries.clear();
        guard.current_memory = 0;
        guard.stats.update_size(0, 0);
        count
    }

    /// Keys whose remaining-TTL fraction has dropped to or below
    /// `threshold` (default 0.10), candidates for proactive refresh.
    pub async fn entries_to_refresh(&self, threshold: f64) -> Vec<CacheKey> {
        let now = Instant::now();
        let guard = self.inner.lock().await;
        guard
            .entries
            .iter()
            .filter(|(_, entry)| entry.should_refresh(threshold, now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// The background sweep: removes everything already expired in one
    /// critical section, holding no I/O while the lock is held.
    pub async fn sweep_expired(&self) -> usize {
        let before;
        let after;
        let mut guard = self.inner.lock().await;
        before = guard.entries.len();
        guard.evict_expired(Instant::now());
        after = guard.entries.len();
        drop(guard);
        let removed = before - after;
        if removed > 0 {
            debug!(removed, "cache sweep removed expired entries");
        }
        removed
    }

    pub async fn stats_snapshot(&self) -> CacheStatsSnapshot {
        let guard = self.inner.lock().await;
        CacheStatsSnapshot {
            total_requests: guard.stats.total_requests,
            cache_hits: guard.stats.cache_hits,
            cache_misses: guard.stats.cache_misses,
            negative_hits: guard.stats.negative_hits,
            current_entries: guard.stats.current_entries,
            max_entries_reached: guard.stats.max_entries_reached,
            current_memory_bytes: guard.stats.current_memory_bytes,
            max_memory_bytes: guard.stats.max_memory_bytes,
            hit_ratio: guard.stats.hit_ratio(),
            average_lookup_time_ms: guard.stats.average_lookup_time_ms(),
            total_evictions: guard.stats.total_evictions(),
            lru_evictions: guard.stats.lru_evictions,
            ttl_expirations: guard.stats.ttl_expirations,
            memory_evictions: guard.stats.memory_evictions,
            manual_evictions: guard.stats.manual_evictions,
            uptime_seconds: guard.stats.uptime(Instant::now()).as_secs_f64(),
        }
    }
}

/// A point-in-time copy of cache statistics, safe to hand to the telemetry
/// and dashboard read APIs without holding the cache lock.
#[derive(Clone, Debug)]
pub struct CacheStatsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub negative_hits: u64,
    pub current_entries: usize,
    pub max_entries_reached: usize,
    pub current_memory_bytes: usize,
    pub max_memory_bytes: usize,
    pub hit_ratio: f64,
    pub average_lookup_time_ms: f64,
    pub total_evictions: u64,
    pub lru_evictions: u64,
    pub ttl_expirations: u64,
    pub memory_evictions: u64,
    pub manual_evictions: u64,
    pub uptime_seconds: f64,
}
