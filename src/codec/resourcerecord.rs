use crate::codec::name::Name;
use crate::codec::rdata::RData;
use crate::enums::{RecordClass, RecordType};
use crate::error::ResolverError;

/// One resource record: the NAME/TYPE/CLASS/TTL/RDLENGTH/RDATA tuple common
/// to the answer, authority and additional sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: Name,
    pub record_type: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    pub rdata: RData,
}

impl ResourceRecord {
    pub fn decode(buf: &[u8], start: usize) -> Result<(Self, usize), ResolverError> {
        let (name, pos) = Name::decode(buf, start)?;
        if pos + 10 > buf.len() {
            return Err(ResolverError::FormatError("resource record header truncated".into()));
        }
        let record_type = RecordType::from(u16::from_be_bytes([buf[pos], buf[pos + 1]]));
        let class = RecordClass::from(u16::from_be_bytes([buf[pos + 2], buf[pos + 3]]));
        let ttl = u32::from_be_bytes(buf[pos + 4..pos + 8].try_into().unwrap());
        let rdlength = u16::from_be_bytes([buf[pos + 8], buf[pos + 9]]) as usize;
        let rdata_start = pos + 10;
        if rdata_start + rdlength > buf.len() {
            return Err(ResolverError::ProtocolError(
                "rdlength overflows the packet".into(),
            ));
        }
        let rdata = RData::decode(buf, rdata_start, rdlength, record_type)?;
        Ok((
            ResourceRecord {
                name,
                record_type,
                class,
                ttl,
                rdata,
            },
            rdata_start + rdlength,
        ))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.name.encode();
        out.extend(u16::from(self.record_type.clone()).to_be_bytes());
        out.extend(u16::from(self.class).to_be_bytes());
        out.extend(self.ttl.to_be_bytes());
        let rdata = self.rdata.encode();
        out.extend((rdata.len() as u16).to_be_bytes());
        out.extend(rdata);
        out
    }

    /// Return a copy of this record with its TTL replaced, used when
    /// serving a cached answer and the remaining TTL has to reflect the
    /// time already spent sitting in the cache.
    pub fn with_ttl(&self, ttl: u32) -> Self {
        ResourceRecord { ttl, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn round_trips_an_a_record() {
        let rr = ResourceRecord {
            name: Name::from_dotted("example.com").unwrap(),
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: 300,
            rdata: RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        };
        let encoded = rr.encode();
        let (decoded, end) = ResourceRecord::decode(&encoded, 0).unwrap();
        assert_eq!(decoded, rr);
        assert_eq!(end, encoded.len());
    }

    #[test]
    fn rejects_rdlength_overflowing_the_packet() {
        let mut buf = Name::from_dotted("example.com").unwrap().encode();
        buf.extend(u16::from(RecordType::A).to_be_bytes());
        buf.extend(u16::from(RecordClass::Internet).to_be_bytes());
        buf.extend(300u32.to_be_bytes());
        buf.extend(100u16.to_be_bytes()); // claims 100 bytes of rdata, none present
        assert!(ResourceRecord::decode(&buf, 0).is_err());
    }

    #[test]
    fn with_ttl_replaces_only_the_ttl() {
        let rr = ResourceRecord {
            name: Name::from_dotted("example.com").unwrap(),
            record_type: RecordType::A,
            class: RecordClass::Internet,
            ttl: 300,
            rdata: RData::A(Ipv4Addr::new(93, 184, 216, 34)),
        };
        let aged = rr.with_ttl(42);
        assert_eq!(aged.ttl, 42);
        assert_eq!(aged.name, rr.name);
        assert_eq!(aged.rdata, rr.rdata);
    }
}
