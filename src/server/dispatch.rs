//! The per-request pipeline shared by the UDP and TCP front ends: decode,
//! rate-limit, admit, resolve-or-serve-from-cache, encode. Protocol-specific
//! listeners own the socket I/O; this module owns everything between a raw
//! buffer coming in and a raw buffer going out (spec.md §4.5's state
//! machine `ACCEPTED -> PARSED -> ADMITTED -> RESOLVED -> REPLIED`).

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::cache::CacheEngine;
use crate::codec::{DnsMessage, ResourceRecord};
use crate::enums::{OpCode, RecordType, Rcode};
use crate::error::ResolverError;
use crate::resolver::Resolver;
use crate::server::concurrency::ConcurrencyLimiter;
use crate::server::rate_limit::RateLimiter;
use crate::telemetry::{log_successful_query, Protocol, RequestTracker};

/// Shared state every accepted request dispatches through. Owned by the
/// UDP/TCP listeners and handed out as a cheap `Arc` clone per request.
pub struct ServerContext {
    pub cache: Arc<CacheEngine>,
    pub resolver: Arc<Resolver>,
    pub rate_limiter: Arc<RateLimiter>,
    pub concurrency: Arc<ConcurrencyLimiter>,
    pub telemetry: Arc<RequestTracker>,
    pub capture_packets: bool,
    pub recursion_available: bool,
}

/// Outcome of dispatching one request: either a wire-ready reply to send,
/// or a deliberate decision to send nothing at all (backpressure/timeout
/// rejections, per spec.md §4.5, are silent so the client times out
/// naturally rather than the server amplifying load).
pub enum DispatchOutcome {
    Reply(Vec<u8>),
    NoReply,
}

pub async fn dispatch(ctx: &ServerContext, buf: &[u8], peer: IpAddr, protocol: Protocol) -> DispatchOutcome {
    if ctx.capture_packets {
        trace!(bytes = ?buf, %peer, "captured inbound packet");
    }

    let request_id = ctx.telemetry.start_request().await;

    let query = match DnsMessage::decode(buf) {
        Ok(query) => query,
        Err(error) => {
            return handle_malformed(ctx, buf, peer, protocol, request_id, &error).await;
        }
    };

    if query.questions.is_empty() || bool::from(query.header.qr) {
        let opt = query
            .additional
            .iter()
            .find(|rr| matches!(rr.record_type, RecordType::OPT))
            .cloned();
        let reply = DnsMessage::reply_to(
            &query,
            Rcode::FormatError,
            ctx.recursion_available,
            Vec::new(),
            Vec::new(),
            with_edns(Vec::new(), &opt),
        );
        finish(ctx, request_id, protocol, peer, &query, &reply, false, None, Some("invalid_query".to_string()))
            .await;
        return encode_or_drop(reply);
    }

    let question = query.questions[0].clone();
    let edns_opt = query
        .additional
        .iter()
        .find(|rr| matches!(rr.record_type, RecordType::OPT))
        .cloned();

    if !matches!(query.header.opcode, OpCode::Query) {
        let reply = DnsMessage::reply_to(
            &query,
            Rcode::NotImplemented,
            ctx.recursion_available,
            Vec::new(),
            Vec::new(),
            with_edns(Vec::new(), &edns_opt),
        );
        finish(ctx, request_id, protocol, peer, &query, &reply, false, None, None).await;
        return encode_or_drop(reply);
    }

    if !ctx.rate_limiter.admit(peer).await {
        let reply = DnsMessage::reply_to(
            &query,
            Rcode::Refused,
            ctx.recursion_available,
            Vec::new(),
            Vec::new(),
            with_edns(Vec::new(), &edns_opt),
        );
        finish(
            ctx,
            request_id,
            protocol,
            peer,
            &query,
            &reply,
            false,
            None,
            Some("rate_limited".to_string()),
        )
        .await;
        return encode_or_drop(reply);
    }

    let _permit = match ctx.concurrency.acquire().await {
        Ok(permit) => permit,
        Err(ResolverError::BackpressureRejected) => {
            ctx.telemetry
                .finish_request(
                    request_id,
                    protocol,
                    peer,
                    question.qtype,
                    question.qname.to_lowercase_dotted(),
                    Rcode::ServFail,
                    false,
                    None,
                    Vec::new(),
                    Some("backpressure_rejection".to_string()),
                )
                .await;
            return DispatchOutcome::NoReply;
        }
        Err(_) => {
            ctx.telemetry
                .finish_request(
                    request_id,
                    protocol,
                    peer,
                    question.qtype,
                    question.qname.to_lowercase_dotted(),
                    Rcode::ServFail,
                    false,
                    None,
                    Vec::new(),
                    Some("timeout".to_string()),
                )
                .await;
            return DispatchOutcome::NoReply;
        }
    };

    if let Some(cached) = ctx.cache.get(&question).await {
        let reply = DnsMessage::reply_to(
            &query,
            cached.response.header.rcode,
            ctx.recursion_available,
            cached.response.answers,
            cached.response.authority,
            with_edns(cached.response.additional, &edns_opt),
        );
        finish(ctx, request_id, protocol, peer, &query, &reply, true, None, None).await;
        return encode_or_drop(reply);
    }

    let resolved = ctx.resolver.resolve(&question, query.header.recursion_desired).await;
    if matches!(resolved.header.rcode, Rcode::NoError | Rcode::NameError) {
        ctx.cache.put(&question, resolved.clone()).await;
    }

    let reply = DnsMessage::reply_to(
        &query,
        resolved.header.rcode,
        ctx.recursion_available,
        resolved.answers,
        resolved.authority,
        with_edns(resolved.additional, &edns_opt),
    );
    finish(ctx, request_id, protocol, peer, &query, &reply, false, None, None).await;
    encode_or_drop(reply)
}

async fn handle_malformed(
    ctx: &ServerContext,
    buf: &[u8],
    peer: IpAddr,
    protocol: Protocol,
    request_id: uuid::Uuid,
    error: &ResolverError,
) -> DispatchOutcome {
    warn!(%peer, %error, "malformed DNS packet");
    let outcome = if buf.len() >= 2 {
        let id = u16::from_be_bytes([buf[0], buf[1]]);
        DispatchOutcome::Reply(DnsMessage::formerr_from_id(id).encode().unwrap_or_default())
    } else {
        DispatchOutcome::NoReply
    };

    ctx.telemetry
        .finish_request(
            request_id,
            protocol,
            peer,
            RecordType::Other(0),
            String::new(),
            Rcode::FormatError,
            false,
            None,
            Vec::new(),
            Some("malformed_packet".to_string()),
        )
        .await;
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn finish(
    ctx: &ServerContext,
    request_id: uuid::Uuid,
    protocol: Protocol,
    peer: IpAddr,
    query: &DnsMessage,
    reply: &DnsMessage,
    cache_hit: bool,
    upstream_server: Option<IpAddr>,
    error: Option<String>,
) {
    let question = query.questions.first();
    let domain = question.map(|q| q.qname.to_lowercase_dotted()).unwrap_or_default();
    let qtype = question.map(|q| q.qtype).unwrap_or(RecordType::Other(0));
    let response_data: Vec<String> = reply.answers.iter().map(|rr| rr.rdata.describe()).collect();

    ctx.telemetry
        .finish_request(
            request_id,
            protocol,
            peer,
            qtype,
            domain.clone(),
            reply.header.rcode,
            cache_hit,
            upstream_server,
            response_data.clone(),
            error,
        )
        .await;

    if matches!(qtype, RecordType::A | RecordType::AAAA)
        && matches!(reply.header.rcode, Rcode::NoError)
        && !response_data.is_empty()
    {
        log_successful_query(&domain, &addresses_of(reply));
    }
}

fn addresses_of(message: &DnsMessage) -> Vec<IpAddr> {
    message
        .answers
        .iter()
        .filter_map(|rr| match &rr.rdata {
            crate::codec::RData::A(addr) => Some(IpAddr::V4(*addr)),
            crate::codec::RData::Aaaa(addr) => Some(IpAddr::V6(*addr)),
            _ => None,
        })
        .collect()
}

/// Echoes the client's OPT pseudo-RR back unmodified, per the EDNS(0)
/// passthrough carried forward from the original implementation: no option
/// negotiation, just preserve-and-forward so EDNS-aware clients don't see
/// their request silently downgraded.
fn with_edns(mut records: Vec<ResourceRecord>, opt: &Option<ResourceRecord>) -> Vec<ResourceRecord> {
    if let Some(opt) = opt {
        records.push(opt.clone());
    }
    records
}

fn encode_or_drop(message: DnsMessage) -> DispatchOutcome {
    match message.encode() {
        Ok(bytes) => DispatchOutcome::Reply(bytes),
        Err(error) => {
            warn!(%error, "failed to encode outgoing reply");
            DispatchOutcome::NoReply
        }
    }
}
