use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use rdns::codec::{DnsMessage, Header, Name, Question, RData, ResourceRecord};
use rdns::enums::{OpCode, PacketType, RecordClass, RecordType, Rcode};

fn sample_query_bytes() -> Vec<u8> {
    let message = DnsMessage {
        header: Header {
            id: 0x1234,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            recursion_desired: true,
            qdcount: 1,
            ..Header::default()
        },
        questions: vec![Question {
            qname: Name::from_dotted("www.example.com").unwrap(),
            qtype: RecordType::A,
            qclass: RecordClass::Internet,
        }],
        answers: vec![],
        authority: vec![],
        additional: vec![],
    };
    message.encode().unwrap()
}

fn sample_response_bytes() -> Vec<u8> {
    let message = DnsMessage {
        header: Header {
            id: 0x1234,
            qr: PacketType::Answer,
            opcode: OpCode::Query,
            recursion_available: true,
            rcode: Rcode::NoError,
            qdcount: 1,
            ancount: 1,
            ..Header::default()
        },
        questions: vec![Question {
            qname: Name::from_dotted("www.example.com").unwrap(),
            qtype: RecordType::A,
            qclass: RecordClass::Internet,
        }],
        answers: vec![ResourceRecord {
            name: Name::from_dotted("www.example.com").unwrap(),
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: 300,
            rdata: RData::A(std::net::Ipv4Addr::new(192, 0, 2, 1)),
        }],
        authority: vec![],
        additional: vec![],
    };
    message.encode().unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let query_bytes = sample_query_bytes();
    let response_bytes = sample_response_bytes();

    c.bench_function("decode_query", |b| {
        b.iter(|| DnsMessage::decode(black_box(&query_bytes)).unwrap())
    });

    c.bench_function("decode_response_with_answer", |b| {
        b.iter(|| DnsMessage::decode(black_box(&response_bytes)).unwrap())
    });

    c.bench_function("encode_response_with_answer", |b| {
        let message = DnsMessage::decode(&response_bytes).unwrap();
        b.iter(|| message.encode().unwrap())
    });

    c.bench_function("name_from_dotted", |b| {
        b.iter(|| Name::from_dotted(black_box("www.example.com")).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
