use packed_struct::prelude::*;

use crate::enums::{OpCode, PacketType, Rcode};

pub const HEADER_BYTES: usize = 12;

/// The header of a DNS message. Ref RFC 1035 §4.1.1.
#[derive(Debug, PackedStruct, PartialEq, Eq, Clone)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct Header {
    #[packed_field(bits = "0..=15", endian = "msb")]
    pub id: u16,
    #[packed_field(bits = "16", ty = "enum")]
    pub qr: PacketType,
    #[packed_field(bits = "17..=20", ty = "enum")]
    pub opcode: OpCode,
    #[packed_field(bits = "21")]
    pub authoritative: bool,
    #[packed_field(bits = "22")]
    pub truncated: bool,
    /// Recursion Desired: set by the client, copied into the response.
    #[packed_field(bits = "23")]
    pub recursion_desired: bool,
    /// Recursion Available: set by the server.
    #[packed_field(bits = "24")]
    pub recursion_available: bool,
    /// Reserved, must be zero.
    #[packed_field(bits = "25")]
    pub z: bool,
    #[packed_field(bits = "26")]
    pub ad: bool,
    #[packed_field(bits = "27")]
    pub cd: bool,
    #[packed_field(bits = "28..=31", ty = "enum")]
    pub rcode: Rcode,
    #[packed_field(bits = "32..=47", endian = "msb")]
    pub qdcount: u16,
    #[packed_field(bits = "48..=63", endian = "msb")]
    pub ancount: u16,
    #[packed_field(bits = "64..=79", endian = "msb")]
    pub nscount: u16,
    #[packed_field(bits = "80..=95", endian = "msb")]
    pub arcount: u16,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            id: 0,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: false,
            ad: false,
            cd: false,
            rcode: Rcode::NoError,
            qdcount: 0,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }
}

impl Header {
    /// Recover just the transaction id from the first two bytes of a
    /// buffer that otherwise failed to parse, so the server can still
    /// reply FORMERR per spec.md §4.1 "Failure modes".
    pub fn peek_id(buf: &[u8]) -> Option<u16> {
        if buf.len() < 2 {
            return None
        }
        Some(u16::from_be_bytes([buf[0], buf[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_query_header() {
        let header = Header {
            id: 0x1234,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            recursion_desired: true,
            qdcount: 1,
            ..Default::default()
        };
        let packed = header.pack().unwrap();
        assert_eq!(packed.len(), HEADER_BYTES);
        let unpacked = Header::unpack(&packed).unwrap();
        assert_eq!(unpacked, header);
    }

    #[test]
    fn peeks_id_from_a_short_buffer() {
        assert_eq!(Header::peek_id(&[0xAB, 0xCD, 0x00]), Some(0xABCD));
        assert_eq!(Header::peek_id(&[0xAB]), None);
    }
}
