use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use crate::codec::{DnsMessage, Header, Question};
use crate::enums::{OpCode, PacketType};
use crate::error::ResolverError;

const MAX_UDP_RESPONSE_BYTES: usize = 4096;

/// Builds the outbound query message for a single upstream transaction.
/// `rd` is `true` for forwarding-mode queries and `false` for the
/// iterative walk, per spec.md §4.4.
pub fn build_query(id: u16, question: Question, rd: bool) -> DnsMessage {
    DnsMessage {
        header: Header {
            id,
            qr: PacketType::Query,
            opcode: OpCode::Query,
            recursion_desired: rd,
            qdcount: 1,
            ..Header::default()
        },
        questions: vec![question],
        answers: Vec::new(),
        authority: Vec::new(),
        additional: Vec::new(),
    }
}

/// Sends one encoded query datagram to `peer` over `socket`, awaits a
/// single response within `timeout`, and verifies the transaction id
/// matches. Per spec.md §4.3, a mismatch is a `protocol_error`, an elapsed
/// timer is `timeout`, and any socket failure is `io_error`.
#[instrument(skip(socket, query), fields(peer = %peer))]
pub async fn transact(
    socket: &UdpSocket,
    query: &DnsMessage,
    peer: SocketAddr,
    timeout: Duration,
) -> Result<DnsMessage, ResolverError> {
    let encoded = query.encode()?;
    socket.send_to(&encoded, peer).await?;

    let mut buf = [0u8; MAX_UDP_RESPONSE_BYTES];
    let (len, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| ResolverError::Timeout)??;

    if from.ip() != peer.ip() {
        debug!(expected = %peer, got = %from, "response from unexpected peer, ignoring");
        return Err(ResolverError::ProtocolError(format!(
            "response came from {from} instead of {peer}"
        )));
    }

    let response = DnsMessage::decode(&buf[..len])?;
    if response.header.id != query.header.id {
        return Err(ResolverError::ProtocolError(format!(
            "transaction id mismatch: sent {}, received {}",
            query.header.id, response.header.id
        )));
    }

    Ok(response)
}
