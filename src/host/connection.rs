//! Per-connection task — framed I/O and command forwarding.
//!
//! Each engine connection spawns a task that:
//! 1. Wraps the socket in the length-prefixed envelope codec.
//! 2. Forwards every envelope to the host loop as a [`HostCommand`].
//! 3. Writes replies as they arrive, in completion order.
//! 4. On engine EOF, keeps writing until every forwarded request has
//!    been answered.
//! 5. On shutdown, flushes replies already produced, then closes.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::ipc::codec::{CodecError, EnvelopeCodec};
use crate::ipc::protocol::Envelope;

/// Unique identifier for an engine connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Request forwarded from a connection task to the host loop.
#[derive(Debug)]
pub struct HostCommand {
    pub request: Envelope,
    /// Where the reply envelope goes. May be used after the host loop
    /// has moved on, for replies that complete asynchronously.
    pub reply_tx: mpsc::UnboundedSender<Envelope>,
}

#[derive(Debug, thiserror::Error)]
enum ConnectionError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("host loop closed")]
    HostGone,
}

/// Spawn a connection task into `connections`.
pub fn spawn_connection(
    connections: &mut JoinSet<()>,
    stream: UnixStream,
    conn_id: ConnectionId,
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
    shutdown: CancellationToken,
) {
    connections.spawn(async move {
        match handle_connection(stream, cmd_tx, shutdown).await {
            Ok(()) => tracing::debug!(?conn_id, "connection closed"),
            Err(e) => tracing::debug!(?conn_id, error = %e, "connection closed with error"),
        }
    });
}

async fn handle_connection(
    stream: UnixStream,
    cmd_tx: mpsc::UnboundedSender<HostCommand>,
    shutdown: CancellationToken,
) -> Result<(), ConnectionError> {
    let mut framed = Framed::new(stream, EnvelopeCodec::new());
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Envelope>();
    // Requests forwarded to the host loop and not yet answered.
    let mut outstanding: usize = 0;
    let mut reading = true;

    while reading || outstanding > 0 {
        tokio::select! {
            frame = framed.next(), if reading => {
                match frame {
                    Some(Ok(request)) => {
                        cmd_tx
                            .send(HostCommand {
                                request,
                                reply_tx: reply_tx.clone(),
                            })
                            .map_err(|_| ConnectionError::HostGone)?;
                        outstanding += 1;
                    }
                    Some(Err(e)) => return Err(ConnectionError::Codec(e)),
                    // Engine closed its write side; answer what it already sent.
                    None => reading = false,
                }
            }
            Some(reply) = reply_rx.recv() => {
                outstanding = outstanding.saturating_sub(1);
                framed.send(reply).await?;
            }
            _ = shutdown.cancelled() => {
                while let Ok(reply) = reply_rx.try_recv() {
                    framed.send(reply).await?;
                }
                return Ok(());
            }
        }
    }
    Ok(())
}
