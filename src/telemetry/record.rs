use std::net::IpAddr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::enums::{RecordType, Rcode};

/// One row of the per-request telemetry stream, per spec.md §4.6 / §6.
#[derive(Clone, Debug)]
pub struct RequestRecord {
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub client_ip: IpAddr,
    pub query_type: RecordType,
    pub domain: String,
    pub response_code: Rcode,
    /// Milliseconds, rounded to two decimals.
    pub response_time_ms: f64,
    pub cache_hit: bool,
    pub upstream_server: Option<IpAddr>,
    pub response_data: Vec<String>,
    pub error: Option<String>,
}

/// Filters accepted by the read-side `recent()` query: substring domain
/// match, exact query_type/client_ip match, boolean cache_hit, since-timestamp.
#[derive(Clone, Debug, Default)]
pub struct RecentFilters {
    pub domain_contains: Option<String>,
    pub query_type: Option<RecordType>,
    pub client_ip: Option<IpAddr>,
    pub cache_hit: Option<bool>,
    pub since: Option<DateTime<Utc>>,
}

impl RecentFilters {
    pub fn matches(&self, record: &RequestRecord) -> bool {
        if let Some(substring) = &self.domain_contains {
            if !record.domain.contains(substring.as_str()) {
                return false;
            }
        }
        if let Some(qtype) = &self.query_type {
            if &record.query_type != qtype {
                return false;
            }
        }
        if let Some(ip) = &self.client_ip {
            if &record.client_ip != ip {
                return false;
            }
        }
        if let Some(cache_hit) = self.cache_hit {
            if record.cache_hit != cache_hit {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if &record.timestamp < since {
                return false;
            }
        }
        true
    }
}
