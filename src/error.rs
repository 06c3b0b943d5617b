use packed_struct::PackingError;
use std::str::Utf8Error;

use crate::enums::Rcode;

/// When things go awry. One variant per row of the error taxonomy: codec
/// failures, policy rejections, upstream transaction failures, and anything
/// unexpected. Only the server front-end converts these into wire
/// responses; every other layer retries locally or propagates upward.
#[derive(Debug)]
pub enum ResolverError {
    /// Message could not be parsed off the wire.
    FormatError(String),
    /// Message parsed but was not a usable query (no question, or QR set).
    InvalidQuery(String),
    /// Client exceeded its rate-limit bucket.
    RateLimited,
    /// Concurrency limiter's wait queue was full.
    BackpressureRejected,
    /// An upstream transaction or the overall resolution deadline expired.
    Timeout,
    /// Socket send/recv failure.
    IoError(std::io::Error),
    /// Transaction id mismatch, or an rdlength overflowing the packet.
    ProtocolError(String),
    /// Connection pool had no room for another endpoint.
    PoolExhausted,
    /// Iterative resolution exceeded the recursion depth cap.
    MaxRecursion,
    /// Failed to pack/unpack a fixed-layout struct.
    BytePackingError(String),
    /// Something failed during startup.
    StartupError(String),
    Utf8Error(Utf8Error),
    /// Anything else unexpected.
    Internal(String),
}

impl std::fmt::Display for ResolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolverError::FormatError(msg) => write!(f, "format error: {msg}"),
            ResolverError::InvalidQuery(msg) => write!(f, "invalid query: {msg}"),
            ResolverError::RateLimited => write!(f, "rate limited"),
            ResolverError::BackpressureRejected => write!(f, "backpressure rejected"),
            ResolverError::Timeout => write!(f, "timeout"),
            ResolverError::IoError(err) => write!(f, "io error: {err}"),
            ResolverError::ProtocolError(msg) => write!(f, "protocol error: {msg}"),
            ResolverError::PoolExhausted => write!(f, "connection pool exhausted"),
            ResolverError::MaxRecursion => write!(f, "max recursion depth reached"),
            ResolverError::BytePackingError(msg) => write!(f, "byte packing error: {msg}"),
            ResolverError::StartupError(msg) => write!(f, "startup error: {msg}"),
            ResolverError::Utf8Error(err) => write!(f, "utf8 error: {err}"),
            ResolverError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ResolverError {}

impl From<std::io::Error> for ResolverError {
    fn from(error: std::io::Error) -> Self {
        ResolverError::IoError(error)
    }
}

impl From<PackingError> for ResolverError {
    fn from(error: PackingError) -> Self {
        ResolverError::BytePackingError(error.to_string())
    }
}

impl From<Utf8Error> for ResolverError {
    fn from(error: Utf8Error) -> Self {
        ResolverError::Utf8Error(error)
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ResolverError {
    fn from(error: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ResolverError::Internal(format!("failed to send on channel: {error}"))
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for ResolverError {
    fn from(error: tokio::sync::oneshot::error::RecvError) -> Self {
        ResolverError::Internal(format!("oneshot sender dropped: {error}"))
    }
}

impl From<ResolverError> for std::io::Error {
    fn from(error: ResolverError) -> Self {
        match error {
            ResolverError::IoError(err) => err,
            other => std::io::Error::other(other.to_string()),
        }
    }
}

impl ResolverError {
    /// Wire RCODE the server front-end should use when a resolution fails
    /// and a response must be sent. `None` means no response should be
    /// sent at all (backpressure: the client times out naturally).
    pub fn to_rcode(&self) -> Option<Rcode> {
        match self {
            ResolverError::FormatError(_) => Some(Rcode::FormatError),
            ResolverError::InvalidQuery(_) => Some(Rcode::FormatError),
            ResolverError::RateLimited => Some(Rcode::Refused),
            ResolverError::BackpressureRejected => None,
            ResolverError::Timeout
            | ResolverError::IoError(_)
            | ResolverError::ProtocolError(_)
            | ResolverError::PoolExhausted
            | ResolverError::MaxRecursion
            | ResolverError::BytePackingError(_)
            | ResolverError::StartupError(_)
            | ResolverError::Utf8Error(_)
            | ResolverError::Internal(_) => Some(Rcode::ServFail),
        }
    }
}
