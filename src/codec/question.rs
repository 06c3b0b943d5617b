use crate::codec::name::Name;
use crate::enums::{RecordClass, RecordType};
use crate::error::ResolverError;

/// The question section of a message. Exactly one per query under this
/// resolver's opcode handling; `qdcount` greater than 1 is rejected
/// upstream of this type, per spec.md §4.1.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question {
    pub qname: Name,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl Question {
    pub fn decode(buf: &[u8], start: usize) -> Result<(Self, usize), ResolverError> {
        let (qname, pos) = Name::decode(buf, start)?;
        if pos + 4 > buf.len() {
            return Err(ResolverError::FormatError("question section truncated".into()));
        }
        let qtype = RecordType::from(u16::from_be_bytes([buf[pos], buf[pos + 1]]));
        let qclass = RecordClass::from(u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]));
        Ok((Question { qname, qtype, qclass }, pos + 4))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.qname.encode();
        out.extend(u16::from(self.qtype.clone()).to_be_bytes());
        out.extend(u16::from(self.qclass).to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_question() {
        let question = Question {
            qname: Name::from_dotted("example.com").unwrap(),
            qtype: RecordType::A,
            qclass: RecordClass::Internet,
        };
        let encoded = question.encode();
        let (decoded, end) = Question::decode(&encoded, 0).unwrap();
        assert_eq!(decoded, question);
        assert_eq!(end, encoded.len());
    }

    #[test]
    fn rejects_a_truncated_question() {
        let mut buf = Name::from_dotted("example.com").unwrap().encode();
        buf.extend([0, 1]); // only qtype, no qclass
        assert!(Question::decode(&buf, 0).is_err());
    }
}
