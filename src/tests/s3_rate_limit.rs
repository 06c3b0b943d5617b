//! A client that exceeds its per-IP request budget within the rolling
//! window gets REFUSED instead of an answer, and a different client's
//! budget is untouched by it.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::codec::{DnsMessage, Header, Name, Question, RData, ResourceRecord};
use crate::enums::{OpCode, PacketType, RecordClass, RecordType, Rcode};
use crate::server::{dispatch::dispatch, ConcurrencyLimiter, DispatchOutcome, RateLimiter, ServerContext};
use crate::telemetry::{Protocol, RequestTracker, DEFAULT_RING_CAPACITY};
use crate::tests::common::resolver_with_upstreams;

fn client_query(id: u16) -> Vec<u8> {
    DnsMessage {
        header: Header {
            id,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            recursion_desired: true,
            qdcount: 1,
            ..Header::default()
        },
        questions: vec![Question {
            qname: Name::from_dotted("cached.example.com").unwrap(),
            qtype: RecordType::A,
            qclass: RecordClass::Internet,
        }],
        answers: vec![],
        authority: vec![],
        additional: vec![],
    }
    .encode()
    .unwrap()
}

async fn context_with_rate_limit(limit: u32) -> Arc<ServerContext> {
    let resolver = resolver_with_upstreams(&[], 3);
    let cache = Arc::new(crate::cache::CacheEngine::new(CacheConfig::default()));

    // Preload the answer so admitted requests never touch the (empty)
    // resolver; this scenario is about admission control, not resolution.
    let question = Question {
        qname: Name::from_dotted("cached.example.com").unwrap(),
        qtype: RecordType::A,
        qclass: RecordClass::Internet,
    };
    let response = DnsMessage {
        header: Header {
            qr: PacketType::Answer,
            rcode: Rcode::NoError,
            ancount: 1,
            ..Header::default()
        },
        questions: vec![question.clone()],
        answers: vec![ResourceRecord {
            name: question.qname.clone(),
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: 300,
            rdata: RData::A(std::net::Ipv4Addr::new(198, 51, 100, 7)),
        }],
        authority: vec![],
        additional: vec![],
    };
    cache.put(&question, response).await;

    Arc::new(ServerContext {
        cache,
        resolver,
        rate_limiter: Arc::new(RateLimiter::new(limit)),
        concurrency: Arc::new(ConcurrencyLimiter::new(64, 64, Duration::from_secs(5))),
        telemetry: Arc::new(RequestTracker::new(DEFAULT_RING_CAPACITY)),
        capture_packets: false,
        recursion_available: true,
    })
}

#[tokio::test]
async fn fourth_request_within_the_window_is_refused() {
    let ctx = context_with_rate_limit(3).await;
    let peer = "203.0.113.9".parse().unwrap();

    for id in 0..3u16 {
        let outcome = dispatch(&ctx, &client_query(id), peer, Protocol::Udp).await;
        let DispatchOutcome::Reply(bytes) = outcome else {
            panic!("admitted request should get a reply");
        };
        let reply = DnsMessage::decode(&bytes).unwrap();
        assert!(matches!(reply.header.rcode, Rcode::NoError), "request {id} should be admitted");
    }

    let outcome = dispatch(&ctx, &client_query(3), peer, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = outcome else {
        panic!("a rejected request still gets a REFUSED reply, not silence");
    };
    let reply = DnsMessage::decode(&bytes).unwrap();
    assert!(matches!(reply.header.rcode, Rcode::Refused));
}

#[tokio::test]
async fn a_different_client_ip_has_its_own_budget() {
    let ctx = context_with_rate_limit(1).await;
    let a = "203.0.113.10".parse().unwrap();
    let b = "203.0.113.11".parse().unwrap();

    let first = dispatch(&ctx, &client_query(0), a, Protocol::Udp).await;
    assert!(matches!(first, DispatchOutcome::Reply(_)));

    let second = dispatch(&ctx, &client_query(1), a, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = second else {
        panic!("expected a REFUSED reply");
    };
    assert!(matches!(DnsMessage::decode(&bytes).unwrap().header.rcode, Rcode::Refused));

    let third = dispatch(&ctx, &client_query(2), b, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = third else {
        panic!("a fresh client IP should still be admitted")
    };
    assert!(matches!(DnsMessage::decode(&bytes).unwrap().header.rcode, Rcode::NoError));
}
