//! Typed RDATA: decode/encode for the record types this resolver
//! understands, and the telemetry pretty-printer spec.md §4.1 describes.
//!
//! Names embedded in RDATA (NS/CNAME/PTR/MX/SOA) can themselves use
//! compression pointers into the *enclosing* message, so decoding always
//! takes the full message buffer rather than just the RR's rdata slice.
//! Because this crate's encoder never emits pointers, every decoded name is
//! re-encoded uncompressed — which is also what keeps cached answers valid
//! no matter where they end up in a later outgoing message.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::codec::name::Name;
use crate::enums::RecordType;
use crate::error::ResolverError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(Name),
    Ns(Name),
    Ptr(Name),
    Mx {
        preference: u16,
        exchange: Name,
    },
    Txt(Vec<Vec<u8>>),
    Soa {
        mname: Name,
        rname: Name,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    /// EDNS(0) OPT pseudo-RR, or any other type: carried opaquely.
    Opaque(Vec<u8>),
}

impl RData {
    pub fn decode(
        buf: &[u8],
        rdata_start: usize,
        rdata_len: usize,
        record_type: RecordType,
    ) -> Result<Self, ResolverError> {
        let rdata_end = rdata_start + rdata_len;
        if rdata_end > buf.len() {
            return Err(ResolverError::FormatError("rdata runs past end of buffer".into()));
        }
        let raw = &buf[rdata_start..rdata_end];

        match record_type {
            RecordType::A => {
                if raw.len() != 4 {
                    return Err(ResolverError::FormatError("A rdata must be 4 bytes".into()));
                }
                Ok(RData::A(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3])))
            }
            RecordType::AAAA => {
                if raw.len() != 16 {
                    return Err(ResolverError::FormatError("AAAA rdata must be 16 bytes".into()));
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(raw);
                Ok(RData::Aaaa(Ipv6Addr::from(octets)))
            }
            RecordType::CNAME => {
                let (name, _) = Name::decode(buf, rdata_start)?;
                Ok(RData::Cname(name))
            }
            RecordType::NS => {
                let (name, _) = Name::decode(buf, rdata_start)?;
                Ok(RData::Ns(name))
            }
            RecordType::PTR => {
                let (name, _) = Name::decode(buf, rdata_start)?;
                Ok(RData::Ptr(name))
            }
            RecordType::MX => {
                if raw.len() < 3 {
                    return Err(ResolverError::FormatError("MX rdata too short".into()));
                }
                let preference = u16::from_be_bytes([raw[0], raw[1]]);
                let (exchange, _) = Name::decode(buf, rdata_start + 2)?;
                Ok(RData::Mx { preference, exchange })
            }
            RecordType::TXT => {
                let mut strings = Vec::new();
                let mut pos = 0usize;
                while pos < raw.len() {
                    let len = raw[pos] as usize;
                    let start = pos + 1;
                    let end = start + len;
                    if end > raw.len() {
                        return Err(ResolverError::FormatError("TXT character-string overruns rdata".into()));
                    }
                    strings.push(raw[start..end].to_vec());
                    pos = end;
                }
                Ok(RData::Txt(strings))
            }
            RecordType::SOA => {
                let (mname, next) = Name::decode(buf, rdata_start)?;
                let (rname, next) = Name::decode(buf, next)?;
                if next + 20 > buf.len() {
                    return Err(ResolverError::FormatError("SOA rdata too short".into()));
                }
                let field = |off: usize| u32::from_be_bytes(buf[next + off..next + off + 4].try_into().unwrap());
                Ok(RData::Soa {
                    mname,
                    rname,
                    serial: field(0),
                    refresh: field(4),
                    retry: field(8),
                    expire: field(12),
                    minimum: field(16),
                })
            }
            RecordType::OPT | RecordType::Other(_) | RecordType::ANY | RecordType::AXFR => {
                Ok(RData::Opaque(raw.to_vec()))
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            RData::A(addr) => addr.octets().to_vec(),
            RData::Aaaa(addr) => addr.octets().to_vec(),
            RData::Cname(name) | RData::Ns(name) | RData::Ptr(name) => name.encode(),
            RData::Mx { preference, exchange } => {
                let mut out = preference.to_be_bytes().to_vec();
                out.extend(exchange.encode());
                out
            }
            RData::Txt(strings) => {
                let mut out = Vec::new();
                for s in strings {
                    let truncated = &s[..s.len().min(255)];
                    out.push(truncated.len() as u8);
                    out.extend_from_slice(truncated);
                }
                out
            }
            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                let mut out = mname.encode();
                out.extend(rname.encode());
                out.extend(serial.to_be_bytes());
                out.extend(refresh.to_be_bytes());
                out.extend(retry.to_be_bytes());
                out.extend(expire.to_be_bytes());
                out.extend(minimum.to_be_bytes());
                out
            }
            RData::Opaque(raw) => raw.clone(),
        }
    }

    /// Human-readable rendering used only for telemetry, per spec.md §4.1.
    pub fn describe(&self) -> String {
        match self {
            RData::A(addr) => addr.to_string(),
            RData::Aaaa(addr) => addr.to_string(),
            RData::Cname(name) | RData::Ns(name) | RData::Ptr(name) => name.to_dotted(),
            RData::Mx { preference, exchange } => format!("{preference} {exchange}"),
            RData::Txt(strings) => strings
                .iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect::<Vec<_>>()
                .join(""),
            RData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => format!("{mname} {rname} {serial} {refresh} {retry} {expire} {minimum}"),
            RData::Opaque(raw) => format!("<{} bytes>", raw.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_a_record() {
        let rdata = RData::A(Ipv4Addr::new(192, 0, 2, 1));
        let encoded = rdata.encode();
        let decoded = RData::decode(&encoded, 0, encoded.len(), RecordType::A).unwrap();
        assert_eq!(decoded, rdata);
        assert_eq!(rdata.describe(), "192.0.2.1");
    }

    #[test]
    fn round_trips_an_mx_record_with_a_name_following_it() {
        let rdata = RData::Mx {
            preference: 10,
            exchange: Name::from_dotted("mail.example.com").unwrap(),
        };
        let encoded = rdata.encode();
        let decoded = RData::decode(&encoded, 0, encoded.len(), RecordType::MX).unwrap();
        assert_eq!(decoded, rdata);
        assert_eq!(rdata.describe(), "10 mail.example.com");
    }

    #[test]
    fn decodes_a_name_compressed_inside_rdata() {
        // Build a fake message: a name at offset 0, then an NS rdata that
        // points back to it instead of repeating the label sequence.
        let mut buf = Name::from_dotted("example.com").unwrap().encode();
        let pointer_offset = buf.len();
        buf.extend_from_slice(&[0xC0, 0x00]);
        let decoded = RData::decode(&buf, pointer_offset, 2, RecordType::NS).unwrap();
        assert_eq!(decoded, RData::Ns(Name::from_dotted("example.com").unwrap()));
    }

    #[test]
    fn txt_concatenates_character_strings() {
        let rdata = RData::Txt(vec![b"hello".to_vec(), b"world".to_vec()]);
        let encoded = rdata.encode();
        let decoded = RData::decode(&encoded, 0, encoded.len(), RecordType::TXT).unwrap();
        assert_eq!(decoded, rdata);
        assert_eq!(rdata.describe(), "helloworld");
    }
}
