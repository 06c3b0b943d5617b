//! An NXDOMAIN response from upstream gets cached as a negative entry and
//! served back out of the cache on a repeat query, without re-querying
//! upstream.

use crate::codec::{DnsMessage, Header, Name, Question};
use crate::enums::{OpCode, PacketType, RecordClass, RecordType, Rcode};
use crate::server::{dispatch::dispatch, DispatchOutcome};
use crate::telemetry::Protocol;
use crate::tests::common::{fresh_cache, permissive_context, resolver_with_upstreams, spawn_fake_upstream};

fn client_query(id: u16, qname: &str) -> Vec<u8> {
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
            qname: Name::from_dotted(qname).unwrap(),
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

#[tokio::test]
async fn nxdomain_is_cached_negative_and_reused() {
    let upstream = spawn_fake_upstream(|_question| (Rcode::NameError, Vec::new())).await;
    let resolver = resolver_with_upstreams(&[upstream], 3);
    let cache = fresh_cache();
    let ctx = permissive_context(resolver, cache);

    let peer = "203.0.113.20".parse().unwrap();
    let query = client_query(0x2222, "doesnotexist.example.com");

    let first = dispatch(&ctx, &query, peer, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = first else {
        panic!("expected a reply");
    };
    assert!(matches!(DnsMessage::decode(&bytes).unwrap().header.rcode, Rcode::NameError));

    let second = dispatch(&ctx, &query, peer, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = second else {
        panic!("expected a reply");
    };
    assert!(matches!(DnsMessage::decode(&bytes).unwrap().header.rcode, Rcode::NameError));

    let stats = ctx.cache_stats().await;
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.negative_hits, 1);
    assert_eq!(stats.cache_misses, 1);
}
