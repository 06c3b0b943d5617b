//! RFC 1035 wire-format codec: header, name compression, question and
//! resource-record (de)serialization, and the handful of response-builder
//! helpers the server front-end uses to turn an inbound query plus an
//! outcome into an outbound message.

pub mod header;
pub mod name;
pub mod question;
pub mod rdata;
pub mod resourcerecord;

pub use header::{Header, HEADER_BYTES};
pub use name::Name;
pub use question::Question;
pub use rdata::RData;
pub use resourcerecord::ResourceRecord;

use packed_struct::PackedStruct;

use crate::enums::{OpCode, PacketType, Rcode};
use crate::error::ResolverError;

/// A full message: header plus the four sections. `qdcount` is almost
/// always 1 under this resolver's opcode handling, but the section is kept
/// as a list per the wire format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl DnsMessage {
    pub fn decode(buf: &[u8]) -> Result<Self, ResolverError> {
        if buf.len() < HEADER_BYTES {
            return Err(ResolverError::FormatError(format!(
                "message shorter than {HEADER_BYTES} byte header"
            )));
        }
        let header_bytes: [u8; HEADER_BYTES] = buf[0..HEADER_BYTES]
            .try_into()
            .expect("slice is exactly HEADER_BYTES long");
        let header = Header::unpack(&header_bytes)?;

        let mut pos = HEADER_BYTES;
        let mut questions = Vec::with_capacity(header.qdcount as usize);
        for _ in 0..header.qdcount {
            let (question, next) = Question::decode(buf, pos)?;
            questions.push(question);
            pos = next;
        }

        let mut decode_records = |count: u16, pos: &mut usize| -> Result<Vec<ResourceRecord>, ResolverError> {
            let mut records = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (record, next) = ResourceRecord::decode(buf, *pos)?;
                records.push(record);
                *pos = next;
            }
            Ok(records)
        };

        let answers = decode_records(header.ancount, &mut pos)?;
        let authority = decode_records(header.nscount, &mut pos)?;
        let additional = decode_records(header.arcount, &mut pos)?;

        Ok(DnsMessage {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    /// Serialize, recomputing the header's section counts from the list
    /// lengths so callers never have to keep them in sync by hand.
    pub fn encode(&self) -> Result<Vec<u8>, ResolverError> {
        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authority.len() as u16;
        header.arcount = self.additional.len() as u16;

        let mut out = header.pack()?.to_vec();
        for question in &self.questions {
            out.extend(question.encode());
        }
        for record in self.answers.iter().chain(&self.authority).chain(&self.additional) {
            out.extend(record.encode());
        }
        Ok(out)
    }

    /// Build a response to `query`: same transaction id, QR=1, RD mirrored,
    /// RA set per `recursion_available`, caller-supplied RCODE and sections.
    /// Per spec.md §4.1, questions are copied verbatim.
    pub fn reply_to(
        query: &DnsMessage,
        rcode: Rcode,
        recursion_available: bool,
        answers: Vec<ResourceRecord>,
        authority: Vec<ResourceRecord>,
        additional: Vec<ResourceRecord>,
    ) -> Self {
        let header = Header {
            id: query.header.id,
            qr: PacketType::Answer,
            opcode: query.header.opcode,
            authoritative: false,
            truncated: false,
            recursion_desired: query.header.recursion_desired,
            recursion_available,
            z: false,
            ad: false,
            cd: false,
            rcode,
            qdcount: query.questions.len() as u16,
            ancount: answers.len() as u16,
            nscount: authority.len() as u16,
            arcount: additional.len() as u16,
        };
        DnsMessage {
            header,
            questions: query.questions.clone(),
            answers,
            authority,
            additional,
        }
    }

    /// An error response carrying no records, just the RCODE.
    pub fn error_response(query: &DnsMessage, rcode: Rcode, recursion_available: bool) -> Self {
        DnsMessage::reply_to(query, rcode, recursion_available, Vec::new(), Vec::new(), Vec::new())
    }

    /// Built when the message couldn't be parsed at all but the first two
    /// bytes were recoverable as a transaction id - the only response the
    /// server front-end can construct for a truly malformed packet.
    pub fn formerr_from_id(id: u16) -> Self {
        let header = Header {
            id,
            qr: PacketType::Answer,
            opcode: OpCode::Query,
            rcode: Rcode::FormatError,
            ..Header::default()
        };
        DnsMessage {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Whether this message contains at least one answer RR of the given
    /// question's type, used to decide a response is cacheable/servable
    /// rather than an empty referral.
    pub fn has_answers(&self) -> bool {
        !self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{RecordClass, RecordType};
    use std::net::Ipv4Addr;

    fn sample_query() -> DnsMessage {
        DnsMessage {
            header: Header {
                id: 0x1234,
                qr: PacketType::Query,
                recursion_desired: true,
                qdcount: 1,
                ..Header::default()
            },
            questions: vec![Question {
                qname: Name::from_dotted("example.com").unwrap(),
                qtype: RecordType::A,
                qclass: RecordClass::Internet,
            }],
            answers: vec![],
            authority: vec![],
            additional: vec![],
        }
    }

    #[test]
    fn round_trips_a_full_message_with_an_answer() {
        let mut query = sample_query();
        query.answers.push(ResourceRecord {
            name: Name::from_dotted("example.com").unwrap(),
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: 300,
            rdata: RData::A(Ipv4Addr::new(192, 0, 2, 1)),
        });
        query.header.ancount = 1;

        let encoded = query.encode().unwrap();
        let decoded = DnsMessage::decode(&encoded).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn reply_to_mirrors_id_and_recursion_desired() {
        let query = sample_query();
        let reply = DnsMessage::reply_to(&query, Rcode::NoError, true, vec![], vec![], vec![]);
        assert_eq!(reply.header.id, 0x1234);
        assert!(matches!(reply.header.qr, PacketType::Answer));
        assert!(reply.header.recursion_desired);
        assert!(reply.header.recursion_available);
        assert_eq!(reply.questions, query.questions);
    }

    #[test]
    fn formerr_from_id_carries_no_sections() {
        let reply = DnsMessage::formerr_from_id(0xABCD);
        assert_eq!(reply.header.id, 0xABCD);
        assert!(matches!(reply.header.rcode, Rcode::FormatError));
        assert!(reply.questions.is_empty());
        let encoded = reply.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_BYTES);
    }

    #[test]
    fn rejects_a_buffer_shorter_than_the_header() {
        assert!(DnsMessage::decode(&[0xAB, 0xCD]).is_err());
    }
}
