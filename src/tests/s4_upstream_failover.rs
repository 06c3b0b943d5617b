//! When the first-tried upstream is unreachable, the resolver fails over
//! to the next configured one instead of giving up.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::codec::{Name, Question, RData, ResourceRecord};
use crate::enums::{RecordClass, RecordType, Rcode};
use crate::tests::common::spawn_fake_upstream;
use crate::upstream::{ConnectionPool, UpstreamServers};
use crate::resolver::Resolver;

#[tokio::test]
async fn failing_over_to_the_next_upstream_still_answers() {
    let answer = Ipv4Addr::new(203, 0, 113, 50);
    let working = spawn_fake_upstream(move |question| {
        (
            Rcode::NoError,
            vec![ResourceRecord {
                name: question.qname.clone(),
                record_type: RecordType::A,
                class: RecordClass::Internet,
                ttl: 300,
                rdata: RData::A(answer),
            }],
        )
    })
    .await;

    // TEST-NET-1 (RFC 5737): routable-looking, never answers, so the
    // transaction reliably times out rather than getting a connection reset.
    let unreachable = "192.0.2.1:53".to_string();

    let upstreams = UpstreamServers::from_config(
        &[unreachable, working.to_string()],
        Duration::from_millis(200),
        1, // one failure is enough to mark a server unavailable
    )
    .unwrap();
    let pool = std::sync::Arc::new(ConnectionPool::new(8, Duration::from_secs(5)));
    let resolver = Resolver::new(upstreams, pool, 10, Duration::from_secs(30));

    let question = Question {
        qname: Name::from_dotted("failover.example.com").unwrap(),
        qtype: RecordType::A,
        qclass: RecordClass::Internet,
    };

    let response = resolver.resolve(&question, true).await;
    assert!(matches!(response.header.rcode, Rcode::NoError));
    assert_eq!(response.answers.len(), 1);
    assert_eq!(response.answers[0].rdata, RData::A(answer));
}

#[tokio::test]
async fn mass_reset_brings_every_upstream_back_into_rotation() {
    // Covers the other half of this scenario: once every configured
    // upstream has been marked unavailable, the next candidate lookup
    // resets all of them rather than leaving forwarding permanently dead.
    let upstreams = UpstreamServers::from_config(
        &["192.0.2.1".to_string(), "192.0.2.2".to_string()],
        Duration::from_millis(200),
        1,
    )
    .unwrap();

    for server in upstreams.candidates() {
        server.record_failure(Instant::now());
    }
    assert!(upstreams.candidates().iter().all(|s| s.is_available()));
    assert_eq!(upstreams.candidates().len(), 2);
}
