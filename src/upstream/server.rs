use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One configured upstream resolver and its health state. Per spec.md §5,
/// each field is updated from whichever task observed a success or
/// failure; transitions are monotonic within a failure burst so plain
/// atomics (rather than one lock guarding the whole struct) are sufficient.
#[derive(Debug)]
pub struct UpstreamServer {
    pub address: IpAddr,
    pub port: u16,
    pub timeout: Duration,
    pub retries: u32,
    is_available: AtomicBool,
    failure_count: AtomicU32,
    last_failure_time: Mutex<Option<Instant>>,
}

impl UpstreamServer {
    pub fn new(address: IpAddr, port: u16, timeout: Duration, retries: u32) -> Self {
        UpstreamServer {
            address,
            port,
            timeout,
            retries,
            is_available: AtomicBool::new(true),
            failure_count: AtomicU32::new(0),
            last_failure_time: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.is_available.load(Ordering::Acquire)
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Acquire)
    }

    /// Clears the failure counter and marks the server available again.
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Release);
        self.is_available.store(true, Ordering::Release);
        *self.last_failure_time.lock().expect("lock poisoned") = None;
    }

    /// Bumps the failure counter; marks the server unavailable once it
    /// reaches `retries`.
    pub fn record_failure(&self, now: Instant) {
        let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
        *self.last_failure_time.lock().expect("lock poisoned") = Some(now);
        if failures >= self.retries {
            self.is_available.store(false, Ordering::Release);
        }
    }

    /// Forces the server back into rotation with a clean slate, used for
    /// the mass re-enablement when every configured upstream is down.
    pub fn force_available(&self) {
        self.is_available.store(true, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
    }

    pub fn socket_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn becomes_unavailable_once_failures_reach_retries() {
        let server = UpstreamServer::new("127.0.0.1".parse().unwrap(), 53, Duration::from_secs(1), 2);
        assert!(server.is_available());
        server.record_failure(Instant::now());
        assert!(server.is_available());
        server.record_failure(Instant::now());
        assert!(!server.is_available());
        assert_eq!(server.failure_count(), 2);
    }

    #[test]
    fn success_clears_the_failure_counter() {
        let server = UpstreamServer::new("127.0.0.1".parse().unwrap(), 53, Duration::from_secs(1), 2);
        server.record_failure(Instant::now());
        server.record_success();
        assert_eq!(server.failure_count(), 0);
        assert!(server.is_available());
    }
}
