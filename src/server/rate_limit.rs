//! Per-client-IP sliding-window rate limiting (spec.md §4.5).
//!
//! Grounded in the Python original's `_check_rate_limit`: a bucket is a
//! deque of timestamps; admission trims everything older than the window,
//! checks the remaining length against the cap, and - on rejection only -
//! drops buckets that trimmed down to empty rather than just trimming them.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

struct RateBucket {
    timestamps: VecDeque<Instant>,
}

pub struct RateLimiter {
    limit_per_ip: u32,
    buckets: Mutex<HashMap<IpAddr, RateBucket>>,
}

impl RateLimiter {
    pub fn new(limit_per_ip: u32) -> Self {
        RateLimiter {
            limit_per_ip,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the request from `ip` is admitted, appending the
    /// current timestamp to its bucket as a side effect. On rejection,
    /// sweeps buckets that have gone empty since their last trim.
    pub async fn admit(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut guard = self.buckets.lock().await;
        let bucket = guard.entry(ip).or_insert_with(|| RateBucket {
            timestamps: VecDeque::new(),
        });
        trim(bucket, now);

        if bucket.timestamps.len() as u32 >= self.limit_per_ip {
            guard.retain(|_, bucket| !bucket.timestamps.is_empty());
            return false;
        }

        bucket.timestamps.push_back(now);
        true
    }
}

fn trim(bucket: &mut RateBucket, now: Instant) {
    while let Some(&oldest) = bucket.timestamps.front() {
        if now.duration_since(oldest) > WINDOW {
            bucket.timestamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_configured_limit_then_rejects() {
        let limiter = RateLimiter::new(3);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        assert!(limiter.admit(ip).await);
        assert!(limiter.admit(ip).await);
        assert!(limiter.admit(ip).await);
        assert!(!limiter.admit(ip).await);
    }

    #[tokio::test]
    async fn different_ips_have_independent_buckets() {
        let limiter = RateLimiter::new(1);
        let a: IpAddr = "203.0.113.1".parse().unwrap();
        let b: IpAddr = "203.0.113.2".parse().unwrap();
        assert!(limiter.admit(a).await);
        assert!(limiter.admit(b).await);
        assert!(!limiter.admit(a).await);
    }
}
