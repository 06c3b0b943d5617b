//! Domain name encoding/decoding, including read-side pointer compression.
//!
//! Names on the wire are sequences of length-prefixed labels terminated by
//! a zero byte. A label whose top two bits are `11` is a *pointer*: a
//! 14-bit offset back into the same message. The encoder in this crate
//! never emits pointers (spec: "compression is a read-side concern"); the
//! decoder must always be able to follow them.

use crate::error::ResolverError;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_JUMPS: usize = 128;
const POINTER_MASK: u8 = 0xC0;

/// A decoded or to-be-encoded domain name, preserving the wire case of each
/// label. Case-insensitive comparisons (cache keys, rate-limit scoping,
/// `invalidate(domain)`) go through [`Name::to_lowercase_dotted`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    pub fn root() -> Self {
        Name { labels: vec![] }
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Self {
        Name { labels }
    }

    /// Parse a dotted-string representation (`example.com`, with or
    /// without a trailing dot) into wire labels.
    pub fn from_dotted(input: &str) -> Result<Self, ResolverError> {
        let trimmed = input.strip_suffix('.').unwrap_or(input);
        if trimmed.is_empty() {
            return Ok(Name::root());
        }
        let mut labels = Vec::new();
        let mut total = 0usize;
        for label in trimmed.split('.') {
            if label.is_empty() || label.len() > MAX_LABEL_LEN {
                return Err(ResolverError::FormatError(format!(
                    "label {label:?} has invalid length"
                )));
            }
            total += label.len() + 1;
            if total > MAX_NAME_LEN {
                return Err(ResolverError::FormatError(format!(
                    "name {input:?} exceeds {MAX_NAME_LEN} bytes"
                )));
            }
            labels.push(label.as_bytes().to_vec());
        }
        Ok(Name { labels })
    }

    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Dotted representation with the original wire case, no trailing dot.
    pub fn to_dotted(&self) -> String {
        self.labels
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Case-insensitive key used for cache lookups, invalidation matching,
    /// and the successful-query log stream's `domain` field.
    pub fn to_lowercase_dotted(&self) -> String {
        self.to_dotted().to_ascii_lowercase()
    }

    /// Whether `self` is `other` or a subdomain of it, compared
    /// case-insensitively label-by-label (used to match glue records
    /// against the NS names they belong to).
    pub fn ends_with(&self, other: &Name) -> bool {
        if other.labels.len() > self.labels.len() {
            return false;
        }
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Encode as an uncompressed label sequence terminated by a zero byte.
    /// Per spec the encoder never emits compression pointers; compression
    /// is purely a read-side concern.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        for label in &self.labels {
            out.push(label.len() as u8);
            out.extend_from_slice(label);
        }
        out.push(0);
        out
    }

    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    /// Decode a name starting at `start` within `buf`, following
    /// compression pointers. Returns the decoded name and the offset in
    /// the *outer* sequence just past the name (or past the 2-byte
    /// pointer that redirected away from it) - per spec §4.1 pt 4, a
    /// pointer jump never advances the outer offset past the pointer
    /// itself.
    pub fn decode(buf: &[u8], start: usize) -> Result<(Self, usize), ResolverError> {
        let mut labels: Vec<Vec<u8>> = Vec::new();
        let mut pos = start;
        let mut outer_end: Option<usize> = None;
        let mut jumps = 0usize;
        let mut total_len = 0usize;

        loop {
            let len_byte = *buf
                .get(pos)
                .ok_or_else(|| ResolverError::FormatError("name runs past end of buffer".into()))?;

            if len_byte & POINTER_MASK == POINTER_MASK {
                let lo = *buf.get(pos + 1).ok_or_else(|| {
                    ResolverError::FormatError("truncated compression pointer".into())
                })?;
                let pointer = (((len_byte & !POINTER_MASK) as usize) << 8) | lo as usize;
                if outer_end.is_none() {
                    outer_end = Some(pos + 2);
                }
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(ResolverError::FormatError(
                        "too many compression pointer jumps".into(),
                    ));
                }
                if pointer >= buf.len() {
                    return Err(ResolverError::FormatError(
                        "compression pointer out of bounds".into(),
                    ));
                }
                pos = pointer;
                continue;
            }

            if len_byte == 0 {
                if outer_end.is_none() {
                    outer_end = Some(pos + 1);
                }
                break;
            }

            if len_byte as usize > MAX_LABEL_LEN {
                return Err(ResolverError::FormatError(format!(
                    "label length {len_byte} exceeds {MAX_LABEL_LEN}"
                )));
            }
            let label_len = len_byte as usize;
            let label_start = pos + 1;
            let label_end = label_start + label_len;
            if label_end > buf.len() {
                return Err(ResolverError::FormatError("label runs past end of buffer".into()));
            }
            total_len += label_len + 1;
            if total_len > MAX_NAME_LEN {
                return Err(ResolverError::FormatError(format!(
                    "name exceeds {MAX_NAME_LEN} bytes"
                )));
            }
            labels.push(buf[label_start..label_end].to_vec());
            pos = label_end;
        }

        let outer_end = outer_end.expect("set before breaking out of the loop");
        Ok((Name { labels }, outer_end))
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.to_dotted())
        }
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::from_dotted(value).unwrap_or_else(|_| Name::root())
    }
}
