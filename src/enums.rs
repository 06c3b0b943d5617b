use enum_iterator::Sequence;
use packed_struct::prelude::*;
use std::fmt::Display;

#[derive(Debug, PrimitiveEnum_u8, Copy, Clone, Eq, PartialEq)]
/// A four bit field that specifies kind of query in this message.
/// This value is set by the originator of a query and copied into the response.
pub enum OpCode {
    /// A standard query (QUERY)
    Query = 0,
    // IQuery = 1, an inverse query (IQUERY) - obsolete per RFC 3425
    /// Server status request (STATUS)
    Status = 2,
    /// 3-15 reserved for future use
    Reserved = 15,
}

impl From<u8> for OpCode {
    fn from(input: u8) -> Self {
        match input {
            0 => Self::Query,
            2 => Self::Status,
            _ => Self::Reserved,
        }
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, Eq, PartialEq)]
/// Response code: NOERROR, FORMERR, SERVFAIL, NXDOMAIN, NOTIMP, REFUSED.
pub enum Rcode {
    NoError = 0,
    FormatError = 1,
    ServFail = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
}

impl Display for Rcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rcode::NoError => "NOERROR",
            Rcode::FormatError => "FORMERR",
            Rcode::ServFail => "SERVFAIL",
            Rcode::NameError => "NXDOMAIN",
            Rcode::NotImplemented => "NOTIMP",
            Rcode::Refused => "REFUSED",
        };
        f.write_str(name)
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence, Hash)]
/// RRType, eg A, NS, MX, etc. Only the types this resolver understands the
/// rdata format of are given a variant; everything else decodes as `OTHER`
/// carrying the raw numeric value for passthrough/caching purposes.
pub enum RecordType {
    /// A host address
    A = 1,
    /// Authoritative name server
    NS = 2,
    /// The canonical name for an alias
    CNAME = 5,
    /// Marks the start of a zone of authority
    SOA = 6,
    /// A domain name pointer
    PTR = 12,
    /// Mail exchange
    MX = 15,
    /// Text strings
    TXT = 16,
    /// IPv6 address record, RFC 3596
    AAAA = 28,
    /// EDNS(0) pseudo-RR, RFC 6891 — passthrough only, never cached.
    OPT = 41,
    /// 252 a request for a transfer of an entire zone
    AXFR = 252,
    /// 255 a request for all records (*)
    ANY = 255,
    Other(u16),
}

impl From<u16> for RecordType {
    fn from(input: u16) -> Self {
        match input {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            41 => Self::OPT,
            252 => Self::AXFR,
            255 => Self::ANY,
            other => Self::Other(other),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(input: RecordType) -> u16 {
        match input {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::OPT => 41,
            RecordType::AXFR => 252,
            RecordType::ANY => 255,
            RecordType::Other(value) => value,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::NS => f.write_str("NS"),
            RecordType::CNAME => f.write_str("CNAME"),
            RecordType::SOA => f.write_str("SOA"),
            RecordType::PTR => f.write_str("PTR"),
            RecordType::MX => f.write_str("MX"),
            RecordType::TXT => f.write_str("TXT"),
            RecordType::AAAA => f.write_str("AAAA"),
            RecordType::OPT => f.write_str("OPT"),
            RecordType::AXFR => f.write_str("AXFR"),
            RecordType::ANY => f.write_str("ANY"),
            RecordType::Other(value) => write!(f, "TYPE{value}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence, Hash)]
/// CLASS fields appear in resource records; most entries are IN.
pub enum RecordClass {
    /// IN - Internet
    Internet = 1,
    /// CH - Chaos (used for management-layer introspection, eg `version.bind`)
    Chaos = 3,
    /// Hesiod
    Hesiod = 4,
    InvalidClass = 0,
}

impl From<u16> for RecordClass {
    fn from(input: u16) -> Self {
        match input {
            1 => Self::Internet,
            3 => Self::Chaos,
            4 => Self::Hesiod,
            _ => Self::InvalidClass,
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(input: RecordClass) -> u16 {
        match input {
            RecordClass::Internet => 1,
            RecordClass::Chaos => 3,
            RecordClass::Hesiod => 4,
            RecordClass::InvalidClass => 0,
        }
    }
}

impl Display for RecordClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RecordClass::Internet => "IN",
            RecordClass::Chaos => "CH",
            RecordClass::Hesiod => "HS",
            RecordClass::InvalidClass => "INVALID",
        })
    }
}

#[derive(Debug, PrimitiveEnum_u8, Clone, Copy, Eq, PartialEq)]
pub enum PacketType {
    Query = 0,
    Answer = 1,
}

impl From<bool> for PacketType {
    fn from(input: bool) -> Self {
        match input {
            false => Self::Query,
            true => Self::Answer,
        }
    }
}

impl From<PacketType> for bool {
    fn from(input: PacketType) -> bool {
        matches!(input, PacketType::Answer)
    }
}
