//! Shared scaffolding for the scenario tests: a fake upstream nameserver
//! driven by a closure, and a `ServerContext` builder with permissive
//! defaults so each scenario only has to override what it's testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::cache::{CacheConfig, CacheEngine};
use crate::codec::{DnsMessage, Question, ResourceRecord};
use crate::enums::Rcode;
use crate::resolver::Resolver;
use crate::server::{ConcurrencyLimiter, RateLimiter, ServerContext};
use crate::telemetry::{RequestTracker, DEFAULT_RING_CAPACITY};
use crate::upstream::{ConnectionPool, UpstreamServers};

/// Binds a UDP socket and answers every query with whatever `respond`
/// returns, for as long as the test process runs. Mirrors a single real
/// upstream resolver closely enough to exercise the wire transaction.
pub async fn spawn_fake_upstream<F>(respond: F) -> SocketAddr
where
    F: Fn(&Question) -> (Rcode, Vec<ResourceRecord>) + Send + Sync + 'static,
{
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind fake upstream");
    let addr = socket.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut buf = [0u8; 512];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(pair) => pair,
                Err(_) => continue,
            };
            let query = match DnsMessage::decode(&buf[..len]) {
                Ok(query) => query,
                Err(_) => continue,
            };
            let Some(question) = query.questions.first() else { continue };
            let (rcode, answers) = respond(question);
            let reply = DnsMessage::reply_to(&query, rcode, true, answers, Vec::new(), Vec::new());
            if let Ok(bytes) = reply.encode() {
                let _ = socket.send_to(&bytes, peer).await;
            }
        }
    });
    addr
}

/// A resolver forwarding to exactly the given addresses, with a short
/// per-try timeout so unreachable-upstream scenarios don't drag.
pub fn resolver_with_upstreams(addrs: &[SocketAddr], retries: u32) -> Arc<Resolver> {
    let configs: Vec<String> = addrs.iter().map(SocketAddr::to_string).collect();
    let upstreams =
        UpstreamServers::from_config(&configs, Duration::from_millis(300), retries).expect("valid upstreams");
    let pool = Arc::new(ConnectionPool::new(16, Duration::from_secs(5)));
    Arc::new(Resolver::new(upstreams, pool, 10, Duration::from_secs(30)))
}

pub fn fresh_cache() -> Arc<CacheEngine> {
    Arc::new(CacheEngine::new(CacheConfig::default()))
}

/// A `ServerContext` with a generous rate limit and concurrency cap so
/// scenarios that aren't specifically testing admission control don't
/// trip over it by accident.
pub fn permissive_context(resolver: Arc<Resolver>, cache: Arc<CacheEngine>) -> Arc<ServerContext> {
    Arc::new(ServerContext {
        cache,
        resolver,
        rate_limiter: Arc::new(RateLimiter::new(10_000)),
        concurrency: Arc::new(ConcurrencyLimiter::new(64, 64, Duration::from_secs(5))),
        telemetry: Arc::new(RequestTracker::new(DEFAULT_RING_CAPACITY)),
        capture_packets: false,
        recursion_available: true,
    })
}
