use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::ResolverError;

type PoolKey = (IpAddr, u16);

struct PooledSocket {
    id: u64,
    socket: Arc<UdpSocket>,
    created_at: Instant,
    checked_out: bool,
}

struct PoolInner {
    sockets: HashMap<PoolKey, Vec<PooledSocket>>,
    next_id: u64,
}

/// A handle to a checked-out pooled socket. The caller must hand it back
/// via [`ConnectionPool::release`] when done - Rust has no async `Drop`,
/// so unlike the teacher's RAII guards this is an explicit call, made on
/// every exit path (success, protocol error, or timeout).
pub struct PooledConnection {
    key: PoolKey,
    id: u64,
    pub socket: Arc<UdpSocket>,
}

/// Sockets keyed by `(address, port)`, per spec.md §4.3: pooling is per
/// peer, never shared or reused across different upstreams.
pub struct ConnectionPool {
    max_connections: usize,
    connection_timeout: Duration,
    inner: Mutex<PoolInner>,
}

impl ConnectionPool {
    pub fn new(max_connections: usize, connection_timeout: Duration) -> Self {
        ConnectionPool {
            max_connections,
            connection_timeout,
            inner: Mutex::new(PoolInner {
                sockets: HashMap::new(),
                next_id: 0,
            }),
        }
    }

    /// Returns a free pooled socket for `(address, port)` if one exists;
    /// otherwise creates one if the total pooled count is below
    /// `max_connections`; otherwise fails with `pool_exhausted`. Socket
    /// creation happens under the lock but is non-blocking, per spec.md §5.
    #[instrument(skip(self))]
    pub async fn get(&self, address: IpAddr, port: u16) -> Result<PooledConnection, ResolverError> {
        let key = (address, port);
        let mut guard = self.inner.lock().await;

        if let Some(entries) = guard.sockets.get_mut(&key) {
            if let Some(entry) = entries.iter_mut().find(|e| !e.checked_out) {
                entry.checked_out = true;
                return Ok(PooledConnection {
                    key,
                    id: entry.id,
                    socket: entry.socket.clone(),
                });
            }
        }

        let total: usize = guard.sockets.values().map(|v| v.len()).sum();
        if total >= self.max_connections {
            return Err(ResolverError::PoolExhausted);
        }

        let socket = UdpSocket::bind(SocketAddr::new(
            if address.is_ipv4() {
                IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
            } else {
                IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
            },
            0,
        ))
        .await?;
        socket.connect(SocketAddr::new(address, port)).await?;
        let socket = Arc::new(socket);

        let id = guard.next_id;
        guard.next_id += 1;
        let entries = guard.sockets.entry(key).or_default();
        entries.push(PooledSocket {
            id,
            socket: socket.clone(),
            created_at: Instant::now(),
            checked_out: true,
        });

        Ok(PooledConnection { key, id, socket })
    }

    /// Marks a checked-out socket available again.
    pub async fn release(&self, handle: PooledConnection) {
        let mut guard = self.inner.lock().await;
        if let Some(entries) = guard.sockets.get_mut(&handle.key) {
            if let Some(entry) = entries.iter_mut().find(|e| e.id == handle.id) {
                entry.checked_out = false;
            }
        }
    }

    /// Drops checked-in sockets older than `connection_timeout`. Run
    /// periodically by a background task alongside the cache sweep.
    pub async fn cleanup(&self) -> usize {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let timeout = self.connection_timeout;
        let mut removed = 0;
        for entries in guard.sockets.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.checked_out || now.duration_since(e.created_at) < timeout);
            removed += before - entries.len();
        }
        guard.sockets.retain(|_, v| !v.is_empty());
        if removed > 0 {
            debug!(removed, "connection pool cleanup");
        }
        removed
    }
}

pub fn spawn_cleanup_task(pool: Arc<ConnectionPool>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            pool.cleanup().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_then_release_reuses_the_same_socket() {
        let pool = ConnectionPool::new(4, Duration::from_secs(30));
        let addr: IpAddr = "127.0.0.1".parse().unwrap();
        let conn = pool.get(addr, 5300).await.unwrap();
        let first_id = conn.id;
        pool.release(conn).await;

        let conn = pool.get(addr, 5300).await.unwrap();
        assert_eq!(conn.id, first_id);
    }

    #[tokio::test]
    async fn exhausts_after_max_connections() {
        let pool = ConnectionPool::new(1, Duration::from_secs(30));
        let addr: IpAddr = "127.0.0.1".parse().unwrap();
        let _held = pool.get(addr, 5301).await.unwrap();
        let second = pool.get(addr, 5302).await;
        assert!(matches!(second, Err(ResolverError::PoolExhausted)));
    }
}
