//! WebSocket connection loop.
//!
//! One [`run_connection`] task per client: it reads frames, translates
//! them 1:1 into room operations, and forwards room events from the
//! connection's outbox back over the socket. An abrupt disconnect is
//! handled exactly like an explicit `leave-room` for every joined room.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use crate::app_state::AppState;
use crate::domain::{ConnectionId, RoomCode, RoomEvent, RoomRegistry};

/// Per-connection dispatch state.
struct ConnectionCtx {
    id: ConnectionId,
    registry: Arc<RoomRegistry>,
    outbox: mpsc::Sender<RoomEvent>,
    joined: HashSet<RoomCode>,
}

impl ConnectionCtx {
    fn new(registry: Arc<RoomRegistry>, outbox: mpsc::Sender<RoomEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            registry,
            outbox,
            joined: HashSet::new(),
        }
    }

    /// Handles one inbound message, returning an optional direct reply.
    ///
    /// Broadcast traffic flows through the outbox; only `load-drawings`
    /// and `error` are direct replies.
    async fn dispatch(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::JoinRoom(code) => {
                let code = match code.parse::<RoomCode>() {
                    Ok(code) => code,
                    Err(e) => return Some(ServerMessage::Error(e.client_message())),
                };
                match self
                    .registry
                    .join(&code, self.id, self.outbox.clone())
                    .await
                {
                    Ok(history) => {
                        self.joined.insert(code);
                        Some(ServerMessage::LoadDrawings(history))
                    }
                    Err(e) => Some(ServerMessage::Error(e.client_message())),
                }
            }
            ClientMessage::Draw(req) => {
                let code = match req.room_code.parse::<RoomCode>() {
                    Ok(code) => code,
                    Err(e) => return Some(ServerMessage::Error(e.client_message())),
                };
                match self.registry.append(&code, self.id, req.line).await {
                    Ok(_) => None,
                    Err(e) => Some(ServerMessage::Error(e.client_message())),
                }
            }
            ClientMessage::Undo(req) => {
                let code = match req.room_code.parse::<RoomCode>() {
                    Ok(code) => code,
                    Err(e) => return Some(ServerMessage::Error(e.client_message())),
                };
                if let Some(claimed) = req.user_id.as_deref()
                    && claimed != self.id.to_string()
                {
                    tracing::debug!(conn = %self.id, claimed, "undo ignored client-claimed identity");
                }
                match self.registry.undo(&code, self.id).await {
                    // "Nothing to undo" is surfaced client-side, not here.
                    Ok(_) => None,
                    Err(e) => Some(ServerMessage::Error(e.client_message())),
                }
            }
            ClientMessage::Clear(code) => {
                let code = match code.parse::<RoomCode>() {
                    Ok(code) => code,
                    Err(e) => return Some(ServerMessage::Error(e.client_message())),
                };
                match self.registry.clear(&code).await {
                    Ok(()) => None,
                    Err(e) => Some(ServerMessage::Error(e.client_message())),
                }
            }
            ClientMessage::LeaveRoom(code) => {
                let code = match code.parse::<RoomCode>() {
                    Ok(code) => code,
                    Err(e) => return Some(ServerMessage::Error(e.client_message())),
                };
                self.registry.leave(&code, self.id).await;
                self.joined.remove(&code);
                None
            }
        }
    }

    /// Leaves every room the connection had joined.
    async fn leave_all(&mut self) {
        for code in std::mem::take(&mut self.joined) {
            self.registry.leave(&code, self.id).await;
        }
    }
}

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (outbox_tx, mut outbox_rx) = mpsc::channel(state.outbound_buffer);
    let mut ctx = ConnectionCtx::new(Arc::clone(&state.registry), outbox_tx);
    let conn = ctx.id;
    tracing::debug!(%conn, "ws connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // Inbound frame from the client.
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => ctx.dispatch(msg).await,
                            Err(_) => Some(ServerMessage::Error("malformed message".to_string())),
                        };
                        if let Some(reply) = reply {
                            let json = serde_json::to_string(&reply).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Room event for this connection.
            event = outbox_rx.recv() => {
                let Some(event) = event else { break };
                let msg = ServerMessage::from(event);
                let json = serde_json::to_string(&msg).unwrap_or_default();
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    // Disconnect, abrupt or not, counts as leaving every joined room.
    ctx.leave_all().await;
    tracing::debug!(%conn, "ws connection closed");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Point, StrokeDraft};
    use crate::store::memory::MemoryStrokeStore;

    fn ctx() -> (ConnectionCtx, mpsc::Receiver<RoomEvent>) {
        let store = Arc::new(MemoryStrokeStore::new());
        let registry = RoomRegistry::new(store, 64, 50);
        let (tx, rx) = mpsc::channel(64);
        (ConnectionCtx::new(registry, tx), rx)
    }

    fn draw(room: &str, points: usize) -> ClientMessage {
        ClientMessage::Draw(super::super::messages::DrawRequest {
            room_code: room.to_string(),
            line: StrokeDraft {
                color: "#ff0000".to_string(),
                stroke_width: 5,
                points: (0..points).map(|_| Point { x: 0.0, y: 0.0 }).collect(),
            },
        })
    }

    #[tokio::test]
    async fn join_replies_with_history_and_tracks_membership() {
        let (mut ctx, _rx) = ctx();
        let reply = ctx.dispatch(ClientMessage::JoinRoom("abc123".to_string())).await;
        let Some(ServerMessage::LoadDrawings(history)) = reply else {
            panic!("expected load-drawings reply");
        };
        assert!(history.is_empty());
        assert_eq!(ctx.joined.len(), 1);
    }

    #[tokio::test]
    async fn bad_room_code_yields_error_reply() {
        let (mut ctx, _rx) = ctx();
        let reply = ctx.dispatch(ClientMessage::JoinRoom("nope".to_string())).await;
        assert!(matches!(reply, Some(ServerMessage::Error(_))));
        assert!(ctx.joined.is_empty());
    }

    #[tokio::test]
    async fn draw_echoes_through_the_outbox_not_the_reply() {
        let (mut ctx, mut rx) = ctx();
        let _ = ctx.dispatch(ClientMessage::JoinRoom("ABC123".to_string())).await;

        let reply = ctx.dispatch(draw("ABC123", 3)).await;
        assert!(reply.is_none());
        assert!(matches!(
            rx.recv().await,
            Some(RoomEvent::StrokeCommitted { .. })
        ));
    }

    #[tokio::test]
    async fn invalid_draw_yields_error_reply_only() {
        let (mut ctx, mut rx) = ctx();
        let _ = ctx.dispatch(ClientMessage::JoinRoom("ABC123".to_string())).await;

        let reply = ctx.dispatch(draw("ABC123", 1)).await;
        assert!(matches!(reply, Some(ServerMessage::Error(_))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_all_empties_membership_and_evicts() {
        let (mut ctx, _rx) = ctx();
        let _ = ctx.dispatch(ClientMessage::JoinRoom("ABC123".to_string())).await;
        let _ = ctx.dispatch(ClientMessage::JoinRoom("XYZ789".to_string())).await;
        assert_eq!(ctx.registry.room_count().await, 2);

        ctx.leave_all().await;
        assert!(ctx.joined.is_empty());
        assert_eq!(ctx.registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn malformed_leave_room_code_yields_error_reply() {
        let (mut ctx, _rx) = ctx();
        let _ = ctx.dispatch(ClientMessage::JoinRoom("ABC123".to_string())).await;

        let reply = ctx.dispatch(ClientMessage::LeaveRoom("nope".to_string())).await;
        assert!(matches!(reply, Some(ServerMessage::Error(_))));
        // Membership is untouched by the malformed request.
        assert_eq!(ctx.joined.len(), 1);

        let reply = ctx.dispatch(ClientMessage::LeaveRoom("ABC123".to_string())).await;
        assert!(reply.is_none());
        assert!(ctx.joined.is_empty());
    }

    #[tokio::test]
    async fn undo_ignores_spoofed_user_id() {
        let (mut ctx, mut rx) = ctx();
        let _ = ctx.dispatch(ClientMessage::JoinRoom("ABC123".to_string())).await;
        let _ = ctx.dispatch(draw("ABC123", 2)).await;
        let _ = rx.recv().await;

        let reply = ctx
            .dispatch(ClientMessage::Undo(super::super::messages::UndoRequest {
                room_code: "ABC123".to_string(),
                user_id: Some("someone-else".to_string()),
            }))
            .await;
        assert!(reply.is_none());
        // The connection's own stroke is the one undone.
        let Some(RoomEvent::StrokeUndone { author, .. }) = rx.recv().await else {
            panic!("expected undo event");
        };
        assert_eq!(author, ctx.id);
    }
}
