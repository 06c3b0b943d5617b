//! UDP front end (spec.md §4.5): one socket, one receive loop, one
//! fire-and-forget task per datagram.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::server::dispatch::{dispatch, DispatchOutcome, ServerContext};
use crate::telemetry::Protocol;

/// Largest datagram this resolver accepts, per spec.md §6 (EDNS(0) buffers
/// can go larger, but anything bigger than this is almost certainly not a
/// legitimate query and isn't worth the allocation).
const UDP_BUFFER_SIZE: usize = 4096;

/// How long shutdown waits for in-flight datagram handlers to finish
/// before abandoning them, per spec.md §5's bounded drain grace period.
const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Binds `addr` and serves UDP queries until `shutdown` fires.
/// Each datagram is handled on its own task, tracked in a `JoinSet` purely
/// so a handler panic doesn't go unnoticed and so shutdown can drain
/// in-flight handlers, matching the fire-and-forget dispatch the original
/// keeps a `_background_tasks` set for.
pub async fn serve_udp(
    addr: SocketAddr,
    ctx: Arc<ServerContext>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> std::io::Result<()> {
    let socket = Arc::new(UdpSocket::bind(addr).await?);
    info!(%addr, "UDP listener ready");

    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut buf = vec![0u8; UDP_BUFFER_SIZE];

    loop {
        while tasks.try_join_next().is_some() {}

        tokio::select! {
            _ = shutdown.changed() => {
                info!(%addr, "UDP listener shutting down");
                break;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(pair) => pair,
                    Err(error) => {
                        warn!(%error, "UDP recv_from failed");
                        continue;
                    }
                };
                let datagram = buf[..len].to_vec();
                let socket = Arc::clone(&socket);
                let ctx = Arc::clone(&ctx);

                tasks.spawn(async move {
                    match dispatch(&ctx, &datagram, peer.ip(), Protocol::Udp).await {
                        DispatchOutcome::Reply(bytes) => {
                            if let Err(error) = socket.send_to(&bytes, peer).await {
                                warn!(%peer, %error, "failed to send UDP reply");
                            }
                        }
                        DispatchOutcome::NoReply => {}
                    }
                });
            }
        }
    }

    let _ = tokio::time::timeout(SHUTDOWN_DRAIN_GRACE, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    Ok(())
}
