//! TCP front end (spec.md §4.5): a 2-byte big-endian length prefix per
//! message, queries on one connection served strictly in arrival order
//! (spec.md §5's TCP pipelining guarantee), the connection kept open until
//! the client closes it or an unrecoverable I/O error occurs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::server::dispatch::{dispatch, DispatchOutcome, ServerContext};
use crate::telemetry::Protocol;

/// Largest TCP DNS message this resolver accepts, guarding against a
/// malicious/broken length prefix driving an unbounded allocation.
const MAX_TCP_MESSAGE: usize = 65535;

/// How long shutdown waits for open connections to finish their current
/// query before abandoning them, per spec.md §5's bounded drain.
const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_secs(10);

pub async fn serve_tcp(
    addr: SocketAddr,
    ctx: Arc<ServerContext>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "TCP listener ready");

    let mut connections: JoinSet<()> = JoinSet::new();

    loop {
        while connections.try_join_next().is_some() {}

        tokio::select! {
            _ = shutdown.changed() => {
                info!(%addr, "TCP listener shutting down, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(%error, "TCP accept failed");
                        continue;
                    }
                };
                let ctx = Arc::clone(&ctx);
                connections.spawn(async move {
                    if let Err(error) = handle_connection(stream, peer, ctx).await {
                        debug!(%peer, %error, "TCP connection ended");
                    }
                });
            }
        }
    }

    let _ = tokio::time::timeout(SHUTDOWN_DRAIN_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    Ok(())
}

async fn handle_connection(mut stream: TcpStream, peer: SocketAddr, ctx: Arc<ServerContext>) -> std::io::Result<()> {
    loop {
        let mut len_prefix = [0u8; 2];
        match stream.read_exact(&mut len_prefix).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(error) => return Err(error),
        }
        let message_len = u16::from_be_bytes(len_prefix) as usize;
        if message_len > MAX_TCP_MESSAGE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "TCP message length prefix exceeds the maximum DNS message size",
            ));
        }

        let mut message = vec![0u8; message_len];
        stream.read_exact(&mut message).await?;

        // Queries on one connection are handled and replied to strictly in
        // order: the next `read_exact` above doesn't even start until this
        // dispatch (and the write it produces) has finished.
        let outcome = dispatch(&ctx, &message, peer.ip(), Protocol::Tcp).await;
        if let DispatchOutcome::Reply(bytes) = outcome {
            let len = (bytes.len() as u16).to_be_bytes();
            stream.write_all(&len).await?;
            stream.write_all(&bytes).await?;
        }
    }
}
