//! Per-connection handler: registration, outbound writer, and dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   0. Finish the WebSocket upgrade (on this task, not the accept loop)
//!   1. Register with the broker, handing it the outbound channel
//!   2. Spawn a writer task that drains the channel into the socket
//!   3. Loop: receive frames → decode → apply to the broker
//!   4. On exit the guard unregisters, which notifies any opponent

use std::sync::Arc;
use std::time::Duration;

use pairhub_peer::{Outbound, PeerReceiver, outbound_channel};
use pairhub_protocol::{ClientMessage, Codec};
use pairhub_room::RoomError;
use pairhub_transport::{
    Connection, ConnectionId, PendingWebSocket, Transport, WebSocketConnection,
    WebSocketTransport,
};

use tokio::task::JoinHandle;

use crate::PairhubError;
use crate::server::ServerState;

/// How long the writer gets to flush after the read loop ends. A client
/// that stopped reading can otherwise pin the task until TCP gives up.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Drop guard that removes a connection from the broker when the handler
/// exits, even on panic. `Drop` is synchronous, so the async lock is taken
/// in a fire-and-forget task.
struct DisconnectGuard<C: Codec> {
    conn_id: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.broker.lock().await.disconnect(conn_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    pending: PendingWebSocket,
    state: Arc<ServerState<C>>,
) -> Result<(), PairhubError> {
    let peer = pending.peer_addr();
    tracing::debug!(conn_id = %pending.id(), %peer, "upgrading connection");
    let conn = Arc::new(WebSocketTransport::upgrade(pending).await?);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (tx, rx) = outbound_channel();
    state.broker.lock().await.connect(conn_id, tx)?;
    let guard = DisconnectGuard {
        conn_id,
        state: Arc::clone(&state),
    };

    let writer = tokio::spawn(write_outbound(
        Arc::clone(&conn),
        rx,
        Arc::clone(&state),
    ));

    loop {
        let data = match tokio::time::timeout(state.idle_timeout, conn.recv())
            .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, dropping");
                break;
            }
        };

        dispatch(&state, conn_id, data).await;
    }

    // Unregistering drops the broker's sender, so the writer flushes
    // whatever is queued and then stops.
    drop(guard);
    finish_writer(conn_id, writer, WRITER_FLUSH_TIMEOUT).await;
    let _ = tokio::time::timeout(WRITER_FLUSH_TIMEOUT, conn.close()).await;
    Ok(())
}

/// Waits up to `limit` for the writer to drain, then aborts it. Returns
/// `false` if it had to be aborted.
async fn finish_writer(
    conn_id: ConnectionId,
    mut writer: JoinHandle<()>,
    limit: Duration,
) -> bool {
    match tokio::time::timeout(limit, &mut writer).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!(%conn_id, error = %e, "writer task failed");
            true
        }
        Err(_) => {
            tracing::debug!(%conn_id, "writer stuck flushing, aborting");
            writer.abort();
            false
        }
    }
}

/// Drains the outbound channel into the socket until it is closed, a
/// close is requested, or a write fails.
async fn write_outbound<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut rx: PeerReceiver,
    state: Arc<ServerState<C>>,
) {
    let conn_id = conn.id();
    while let Some(item) = rx.recv().await {
        let bytes = match item {
            Outbound::Message(msg) => match state.codec.encode(&msg) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "failed to encode message");
                    continue;
                }
            },
            Outbound::Relay(frame) => frame,
            Outbound::Close => {
                let _ = conn.close().await;
                break;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Applies one inbound frame to the broker.
///
/// Frames that don't decode, or whose `type` is unknown, are logged and
/// dropped. The connection stays open either way.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    conn_id: ConnectionId,
    data: Vec<u8>,
) {
    let msg: ClientMessage = match state.codec.decode(&data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "dropping undecodable frame");
            return;
        }
    };
    tracing::trace!(%conn_id, kind = msg.kind(), "inbound message");

    let mut broker = state.broker.lock().await;
    let result: Result<(), RoomError> = match msg {
        ClientMessage::JoinPublic { display_name } => {
            broker.join_public(conn_id, display_name.as_deref())
        }
        ClientMessage::CreatePrivate {
            display_name,
            room_id,
        } => broker.create_private(conn_id, display_name.as_deref(), &room_id),
        ClientMessage::JoinPrivate {
            display_name,
            room_id,
        } => broker.join_private(conn_id, display_name.as_deref(), &room_id),
        ClientMessage::Offer { room_id }
        | ClientMessage::Answer { room_id }
        | ClientMessage::Ice { room_id } => {
            // The original bytes go out, not a re-encoding.
            broker.relay(conn_id, room_id.as_deref(), data);
            Ok(())
        }
        ClientMessage::ReadyForNewGame { room_id, req_id } => {
            broker.request_rematch(conn_id, room_id.as_deref(), req_id);
            Ok(())
        }
        ClientMessage::Leave => {
            broker.leave(conn_id);
            Ok(())
        }
        ClientMessage::Unknown => {
            tracing::debug!(%conn_id, "ignoring unknown message type");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(%conn_id, error = %e, "request rejected");
        broker.peers().send(conn_id, e.to_reply());
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_finish_writer_returns_once_writer_drains() {
        let writer = tokio::spawn(async {});
        let drained =
            finish_writer(ConnectionId::new(1), writer, Duration::from_secs(1)).await;
        assert!(drained);
    }

    #[tokio::test]
    async fn test_finish_writer_aborts_a_stuck_writer() {
        // The task holds `alive` until it is dropped by the abort.
        let (alive, dropped) = oneshot::channel::<()>();
        let writer = tokio::spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        });

        let drained = tokio::time::timeout(
            Duration::from_secs(1),
            finish_writer(ConnectionId::new(2), writer, Duration::from_millis(50)),
        )
        .await
        .expect("should give up after the limit");

        assert!(!drained);
        assert!(
            dropped.await.is_err(),
            "aborted writer should release its state"
        );
    }
}
