use std::net::Ipv4Addr;

use crate::codec::{DnsMessage, Header, Name, Question, RData, ResourceRecord};
use crate::enums::{OpCode, PacketType, RecordClass, RecordType, Rcode};

/// The 13 well-known IPv4 root-server addresses, copied verbatim at
/// startup per spec.md §4.4. The only built-in zone data this resolver has.
pub const ROOT_SERVERS: [Ipv4Addr; 13] = [
    Ipv4Addr::new(198, 41, 0, 4),
    Ipv4Addr::new(170, 247, 170, 2),
    Ipv4Addr::new(192, 33, 4, 12),
    Ipv4Addr::new(199, 7, 91, 13),
    Ipv4Addr::new(192, 203, 230, 10),
    Ipv4Addr::new(192, 5, 5, 241),
    Ipv4Addr::new(192, 112, 36, 4),
    Ipv4Addr::new(198, 97, 190, 53),
    Ipv4Addr::new(192, 36, 148, 17),
    Ipv4Addr::new(192, 58, 128, 30),
    Ipv4Addr::new(193, 0, 14, 129),
    Ipv4Addr::new(199, 7, 83, 42),
    Ipv4Addr::new(202, 12, 27, 33),
];

const ROOT_REFERRAL_TTL: u32 = 3_600_000;

/// The "referral to roots" response for RD=0 clients (spec.md §4.4): no
/// answers, NS records for the first three roots in authority, their A
/// records as glue in additional.
pub fn root_referral() -> (Vec<ResourceRecord>, Vec<ResourceRecord>) {
    let root_name = Name::root();
    let mut authority = Vec::new();
    let mut additional = Vec::new();

    for (index, addr) in ROOT_SERVERS.iter().take(3).enumerate() {
        let ns_name = Name::from_dotted(&format!("{}.root-servers.net", ('a' as u8 + index as u8) as char))
            .expect("generated root server name is well-formed");

        authority.push(ResourceRecord {
            name: root_name.clone(),
            record_type: RecordType::NS,
            class: RecordClass::Internet,
            ttl: ROOT_REFERRAL_TTL,
            rdata: RData::Ns(ns_name.clone()),
        });
        additional.push(ResourceRecord {
            name: ns_name,
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: ROOT_REFERRAL_TTL,
            rdata: RData::A(*addr),
        });
    }

    (authority, additional)
}

/// The full response an RD=0 client gets (spec.md §4.4's "iterative
/// resolver"): QR=1, RA=0 (recursion genuinely isn't performed for this
/// reply), NOERROR, no answers, [`root_referral`]'s NS/glue records. This
/// is the resolver's entry point for non-recursive queries; forwarding and
/// the full iterative walk are only ever reached when RD=1.
pub fn referral_response(question: &Question) -> DnsMessage {
    let (authority, additional) = root_referral();
    DnsMessage {
        header: Header {
            qr: PacketType::Answer,
            opcode: OpCode::Query,
            recursion_available: false,
            rcode: Rcode::NoError,
            qdcount: 1,
            ..Header::default()
        },
        questions: vec![question.clone()],
        answers: Vec::new(),
        authority,
        additional,
    }
}
