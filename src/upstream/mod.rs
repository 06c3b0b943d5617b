//! Upstream DNS transport: per-server health tracking, a single UDP
//! query/response transaction, and a connection pool keyed by peer.

pub mod pool;
pub mod server;
pub mod transport;

pub use pool::{spawn_cleanup_task, ConnectionPool, PooledConnection};
pub use server::UpstreamServer;
pub use transport::{build_query, transact};

use std::net::IpAddr;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::error::ResolverError;

/// The configured set of upstream resolvers, in the order given by
/// `upstream_servers`. Candidate selection for a single resolution
/// (availability filtering, randomization, mass reset) happens here so the
/// resolver can just ask for "the servers to try now".
pub struct UpstreamServers {
    servers: Vec<UpstreamServer>,
}

impl UpstreamServers {
    /// Parses each entry as `host` or `host:port`, defaulting to port 53.
    pub fn from_config(
        addresses: &[String],
        timeout: Duration,
        retries: u32,
    ) -> Result<Self, ResolverError> {
        let mut servers = Vec::with_capacity(addresses.len());
        for address in addresses {
            let (host, port) = match address.rsplit_once(':') {
                Some((host, port)) => {
                    let port: u16 = port.parse().map_err(|_| {
                        ResolverError::StartupError(format!("invalid upstream port in {address:?}"))
                    })?;
                    (host, port)
                }
                None => (address.as_str(), 53),
            };
            let ip: IpAddr = host.parse().map_err(|_| {
                ResolverError::StartupError(format!("upstream {address:?} is not a literal IP address"))
            })?;
            servers.push(UpstreamServer::new(ip, port, timeout, retries));
        }
        Ok(UpstreamServers { servers })
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Step 1-2 of forwarding mode (spec.md §4.4): all available servers,
    /// mass-reset to all of them if none are available, then shuffled.
    pub fn candidates(&self) -> Vec<&UpstreamServer> {
        let mut candidates: Vec<&UpstreamServer> = self.servers.iter().filter(|s| s.is_available()).collect();
        if candidates.is_empty() && !self.servers.is_empty() {
            for server in &self.servers {
                server.force_available();
            }
            candidates = self.servers.iter().collect();
        }
        candidates.shuffle(&mut rand::rng());
        candidates
    }
}
