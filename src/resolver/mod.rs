//! Forwarding-with-failover and iterative-from-roots resolution (C4).

pub mod roots;

use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tracing::{instrument, warn};

use crate::codec::{DnsMessage, Name, Question, RData};
use crate::enums::{RecordClass, RecordType, Rcode};
use crate::error::ResolverError;
use crate::upstream::{build_query, transact, ConnectionPool, UpstreamServers};

/// Per-resolution state: the question being chased, how deep the
/// iterative walk has recursed, the wall deadline, and which nameservers
/// have already been tried (spec.md §3).
pub struct QueryContext {
    pub recursion_depth: u32,
    pub deadline: Instant,
    pub visited_nameservers: HashSet<IpAddr>,
}

impl QueryContext {
    pub fn new(overall_timeout: Duration) -> Self {
        QueryContext {
            recursion_depth: 0,
            deadline: Instant::now() + overall_timeout,
            visited_nameservers: HashSet::new(),
        }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Builds a response matching `question` with the given RCODE and no
/// records, per the error-response helper spec.md §4.4 calls for.
pub fn error_response(question: &Question, rcode: Rcode) -> DnsMessage {
    use crate::codec::Header;
    use crate::enums::{OpCode, PacketType};
    DnsMessage {
        header: Header {
            qr: PacketType::Answer,
            opcode: OpCode::Query,
            recursion_available: true,
            rcode,
            qdcount: 1,
            ..Header::default()
        },
        questions: vec![question.clone()],
        answers: Vec::new(),
        authority: Vec::new(),
        additional: Vec::new(),
    }
}

pub struct Resolver {
    upstreams: UpstreamServers,
    pool: Arc<ConnectionPool>,
    max_recursion_depth: u32,
    resolution_timeout: Duration,
    next_txn_id: AtomicU16,
}

impl Resolver {
    /// `resolution_timeout` is the wall-clock budget given to a single
    /// resolution's [`QueryContext`] deadline, per spec.md §3.
    pub fn new(
        upstreams: UpstreamServers,
        pool: Arc<ConnectionPool>,
        max_recursion_depth: u32,
        resolution_timeout: Duration,
    ) -> Self {
        Resolver {
            upstreams,
            pool,
            max_recursion_depth,
            resolution_timeout,
            next_txn_id: AtomicU16::new(0),
        }
    }

    fn next_id(&self) -> u16 {
        self.next_txn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Entry point. RD=0 clients get the static referral-to-roots response
    /// (spec.md §4.4's "iterative resolver (for RD=0 clients)"); RD=1
    /// clients get forwarding-with-failover when upstreams are configured,
    /// falling back to the full iterative walk from root hints on total
    /// forwarding failure or when no upstreams are configured at all.
    #[instrument(skip(self, question), fields(qname = %question.qname, qtype = %question.qtype))]
    pub async fn resolve(&self, question: &Question, recursion_desired: bool) -> DnsMessage {
        if !recursion_desired {
            return roots::referral_response(question);
        }

        let ctx = QueryContext::new(self.resolution_timeout);

        if !self.upstreams.is_empty() {
            if let Some(response) = self.forward(question, ctx.deadline).await {
                return response;
            }
            warn!("all upstream servers failed, falling back to iterative resolution");
        }

        self.iterative_walk(question, ctx.deadline, 0).await
    }

    /// Forwarding mode (spec.md §4.4): try each available upstream in
    /// randomized order, with per-server failure bookkeeping. `None` means
    /// every candidate failed and the caller should fall through.
    async fn forward(&self, question: &Question, deadline: Instant) -> Option<DnsMessage> {
        for server in self.upstreams.candidates() {
            if Instant::now() >= deadline {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            let per_try_timeout = remaining.min(server.timeout);
            if per_try_timeout.is_zero() {
                break;
            }

            let query = build_query(self.next_id(), question.clone(), true);
            match self
                .transact_via_pool(server.socket_addr(), &query, per_try_timeout)
                .await
            {
                Ok(response) => {
                    server.record_success();
                    return Some(response);
                }
                Err(error) => {
                    warn!(upstream = %server.socket_addr(), %error, "upstream transaction failed");
                    server.record_failure(Instant::now());
                }
            }
        }
        None
    }

    /// Iterative mode (spec.md §4.4): walk from root hints, following
    /// referrals until an answer, an NXDOMAIN, or the depth/deadline caps.
    fn iterative_walk<'a>(
        &'a self,
        question: &'a Question,
        deadline: Instant,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = DnsMessage> + Send + 'a>> {
        Box::pin(async move {
            if Instant::now() >= deadline {
                return error_response(question, Rcode::ServFail);
            }
            if depth >= self.max_recursion_depth {
                return error_response(question, Rcode::ServFail);
            }

            let mut nameservers: Vec<IpAddr> =
                roots::ROOT_SERVERS.iter().map(|addr| IpAddr::V4(*addr)).collect();
            let mut visited: HashSet<IpAddr> = HashSet::new();

            loop {
                if Instant::now() >= deadline {
                    return error_response(question, Rcode::ServFail);
                }

                let mut referral: Option<Vec<IpAddr>> = None;
                let mut terminal: Option<DnsMessage> = None;

                for ns in nameservers.iter().copied().collect::<Vec<_>>() {
                    if visited.contains(&ns) || Instant::now() >= deadline {
                        continue;
                    }
                    visited.insert(ns);

                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let per_try_timeout = remaining.min(Duration::from_secs(5));
                    if per_try_timeout.is_zero() {
                        continue;
                    }
                    let query = build_query(self.next_id(), question.clone(), false);
                    let response = match self
                        .transact_via_pool(SocketAddr::new(ns, 53), &query, per_try_timeout)
                        .await
                    {
                        Ok(response) => response,
                        Err(_) => continue,
                    };

                    if response.has_answers() || matches!(response.header.rcode, Rcode::NameError) {
                        terminal = Some(response);
                        break;
                    }

                    if response.authority.is_empty() {
                        continue;
                    }

                    let ns_names: Vec<Name> = response
                        .authority
                        .iter()
                        .filter(|rr| matches!(rr.record_type, RecordType::NS))
                        .filter_map(|rr| match &rr.rdata {
                            RData::Ns(name) => Some(name.clone()),
                            _ => None,
                        })
                        .collect();
                    if ns_names.is_empty() {
                        continue;
                    }

                    let mut glue: Vec<IpAddr> = response
                        .additional
                        .iter()
                        .filter(|rr| matches!(rr.record_type, RecordType::A))
                        .filter(|rr| ns_names.iter().any(|name| rr.name.ends_with(name) || &rr.name == name))
                        .filter_map(|rr| match rr.rdata {
                            RData::A(ip) => Some(IpAddr::V4(ip)),
                            _ => None,
                        })
                        .collect();

                    if glue.is_empty() {
                        for ns_name in &ns_names {
                            if ns_name == &question.qname {
                                continue; // would recurse into the same query
                            }
                            let sub_question = Question {
                                qname: ns_name.clone(),
                                qtype: RecordType::A,
                                qclass: RecordClass::Internet,
                            };
                            let sub_response =
                                self.iterative_walk(&sub_question, deadline, depth + 1).await;
                            for rr in &sub_response.answers {
                                if let RData::A(ip) = rr.rdata {
                                    glue.push(IpAddr::V4(ip));
                                }
                            }
                        }
                    }

                    if !glue.is_empty() {
                        referral = Some(glue);
                        break;
                    }
                }

                if let Some(response) = terminal {
                    return response;
                }
                match referral {
                    Some(next) => nameservers = next,
                    None => return error_response(question, Rcode::ServFail),
                }
            }
        })
    }

    async fn transact_via_pool(
        &self,
        peer: SocketAddr,
        query: &DnsMessage,
        timeout: Duration,
    ) -> Result<DnsMessage, ResolverError> {
        match self.pool.get(peer.ip(), peer.port()).await {
            Ok(conn) => {
                let result = transact(&conn.socket, query, peer, timeout).await;
                self.pool.release(conn).await;
                result
            }
            Err(ResolverError::PoolExhausted) => {
                let bind_addr = if peer.is_ipv4() {
                    SocketAddr::new(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 0)
                } else {
                    SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), 0)
                };
                let socket = UdpSocket::bind(bind_addr).await?;
                transact(&socket, query, peer, timeout).await
            }
            Err(other) => Err(other),
        }
    }
}
