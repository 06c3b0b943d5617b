//! A packet too short to even contain a header still gets a FORMERR reply
//! carrying whatever transaction id could be recovered from the first two
//! bytes, per the malformed-packet handling path.

use crate::codec::DnsMessage;
use crate::enums::Rcode;
use crate::server::{dispatch::dispatch, DispatchOutcome};
use crate::telemetry::Protocol;
use crate::tests::common::{fresh_cache, permissive_context, resolver_with_upstreams};

#[tokio::test]
async fn truncated_packet_gets_formerr_with_recovered_id() {
    let resolver = resolver_with_upstreams(&[], 3);
    let cache = fresh_cache();
    let ctx = permissive_context(resolver, cache);

    let peer = "203.0.113.2".parse().unwrap();
    let malformed = vec![0x12, 0x34, 0xFF];

    let outcome = dispatch(&ctx, &malformed, peer, Protocol::Udp).await;
    let DispatchOutcome::Reply(bytes) = outcome else {
        panic!("a recoverable transaction id should still get a reply");
    };
    let reply = DnsMessage::decode(&bytes).unwrap();
    assert_eq!(reply.header.id, 0x1234);
    assert!(matches!(reply.header.rcode, Rcode::FormatError));
    assert!(reply.questions.is_empty());
}

#[tokio::test]
async fn packet_too_short_for_even_a_transaction_id_gets_no_reply() {
    let resolver = resolver_with_upstreams(&[], 3);
    let cache = fresh_cache();
    let ctx = permissive_context(resolver, cache);

    let peer = "203.0.113.3".parse().unwrap();
    let outcome = dispatch(&ctx, &[0xAB], peer, Protocol::Udp).await;
    assert!(matches!(outcome, DispatchOutcome::NoReply));
}
