//! Two queries written back-to-back on one TCP connection, before reading
//! either response, come back length-prefixed and strictly in the order
//! they were sent.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::codec::{DnsMessage, Header, Name, Question, RData, ResourceRecord};
use crate::enums::{OpCode, PacketType, RecordClass, RecordType, Rcode};
use crate::server::serve_tcp;
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

fn reserve_local_port() -> SocketAddr {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = probe.local_addr().expect("local addr");
    drop(probe);
    addr
}

async fn read_one_response(stream: &mut TcpStream) -> DnsMessage {
    let mut len_prefix = [0u8; 2];
    stream.read_exact(&mut len_prefix).await.expect("read length prefix");
    let len = u16::from_be_bytes(len_prefix) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.expect("read message body");
    DnsMessage::decode(&body).expect("decode response")
}

#[tokio::test]
async fn pipelined_queries_get_in_order_responses() {
    let upstream = spawn_fake_upstream(|question| {
        let answer = if question.qname.to_lowercase_dotted() == "one.example.com" {
            Ipv4Addr::new(10, 0, 0, 1)
        } else {
            Ipv4Addr::new(10, 0, 0, 2)
        };
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

    let resolver = resolver_with_upstreams(&[upstream], 3);
    let cache = fresh_cache();
    let ctx = permissive_context(resolver, cache);

    let addr = reserve_local_port();
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(serve_tcp(addr, ctx, shutdown_rx));
    // Give the listener a moment to bind before connecting.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(addr).await.expect("connect to TCP listener");

    let first_query = client_query(1, "one.example.com");
    let second_query = client_query(2, "two.example.com");
    let mut pipelined = Vec::new();
    pipelined.extend((first_query.len() as u16).to_be_bytes());
    pipelined.extend(&first_query);
    pipelined.extend((second_query.len() as u16).to_be_bytes());
    pipelined.extend(&second_query);
    stream.write_all(&pipelined).await.expect("write pipelined queries");

    let first_response = read_one_response(&mut stream).await;
    let second_response = read_one_response(&mut stream).await;

    assert_eq!(first_response.header.id, 1);
    assert_eq!(first_response.answers[0].rdata, RData::A(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(second_response.header.id, 2);
    assert_eq!(second_response.answers[0].rdata, RData::A(Ipv4Addr::new(10, 0, 0, 2)));
}
