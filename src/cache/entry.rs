use std::time::Instant;

use crate::codec::DnsMessage;

/// Whether a cached response represents a real answer or a cached failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Positive,
    Negative,
}

/// A cached response plus the bookkeeping needed for TTL expiry, LRU
/// ordering and memory accounting. Per spec.md §3, mutated only by access
/// recording (counter, last_accessed); everything else is destroy-and-recreate.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub response: DnsMessage,
    pub created_at: Instant,
    pub ttl: u32,
    pub original_ttl: u32,
    pub access_count: u64,
    pub last_accessed: Instant,
    pub entry_kind: EntryKind,
    pub memory_estimate: usize,
}

/// Estimated bytes overhead for the entry's own bookkeeping fields, on top
/// of the encoded message bytes it holds - mirrors the fixed 200-byte
/// estimate the original cache used per entry.
const ENTRY_OVERHEAD_BYTES: usize = 200;

impl CacheEntry {
    pub fn new(response: DnsMessage, ttl: u32, entry_kind: EntryKind, now: Instant) -> Self {
        let memory_estimate = estimate_memory(&response);
        CacheEntry {
            response,
            created_at: now,
            ttl,
            original_ttl: ttl,
            access_count: 0,
            last_accessed: now,
            entry_kind,
            memory_estimate,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at).as_secs() > self.ttl as u64
    }

    /// `max(0, created_at + ttl - now)`.
    pub fn remaining_ttl(&self, now: Instant) -> u32 {
        let elapsed = now.duration_since(self.created_at).as_secs();
        self.ttl.saturating_sub(elapsed as u32)
    }

    pub fn record_access(&mut self, now: Instant) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    /// Whether the remaining fraction of the original TTL has dropped to or
    /// below `threshold` (default 0.10 per spec.md §4.2).
    pub fn should_refresh(&self, threshold: f64, now: Instant) -> bool {
        if self.original_ttl == 0 {
            return false;
        }
        let remaining_ratio = self.remaining_ttl(now) as f64 / self.original_ttl as f64;
        remaining_ratio <= threshold
    }
}

/// A rough estimate of how much memory a cached message occupies: a fixed
/// per-entry overhead plus the wire-encoded size of the header, questions
/// and every record across all three sections.
fn estimate_memory(response: &DnsMessage) -> usize {
    let mut size = crate::codec::HEADER_BYTES;
    for question in &response.questions {
        size += question.encode().len();
    }
    for record in response
        .answers
        .iter()
        .chain(&response.authority)
        .chain(&response.additional)
    {
        size += record.encode().len();
    }
    ENTRY_OVERHEAD_BYTES + size
}
