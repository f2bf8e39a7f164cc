//! Room session actor: the authoritative state machine for one room.
//!
//! Every room is owned by a single spawned task ([`RoomSession::run`])
//! that drains a FIFO command inbox. That structure gives the two core
//! ordering guarantees for free: operations against one room are mutually
//! exclusive and applied in acceptance order, and nothing is broadcast
//! before its store write has completed.
//!
//! [`RoomHandle`] is the cloneable sender side used by the registry and
//! the transport layer.

use std::sync::Weak;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

use super::broadcaster::{Broadcaster, Outbox};
use super::connection_id::ConnectionId;
use super::registry::RoomRegistry;
use super::room_code::RoomCode;
use super::room_event::RoomEvent;
use super::stroke::{Stroke, StrokeDraft};
use crate::error::RelayError;
use crate::store::SharedStrokeStore;

/// Commands accepted by a room session's inbox.
pub(crate) enum RoomCommand {
    Join {
        conn: ConnectionId,
        outbox: Outbox,
        reply: oneshot::Sender<Result<Vec<Stroke>, RelayError>>,
    },
    Append {
        conn: ConnectionId,
        draft: StrokeDraft,
        reply: oneshot::Sender<Result<Stroke, RelayError>>,
    },
    Undo {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<Option<i64>, RelayError>>,
    },
    Clear {
        reply: oneshot::Sender<Result<(), RelayError>>,
    },
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to one room session.
///
/// All methods enqueue a command and await its reply. A closed inbox
/// (the session retired between lookup and send) surfaces as
/// [`RelayError::SessionClosed`]; the registry's wrappers retry against
/// a fresh session.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
    epoch: u64,
}

impl RoomHandle {
    pub(crate) fn new(tx: mpsc::Sender<RoomCommand>, epoch: u64) -> Self {
        Self { tx, epoch }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RelayError> {
        self.tx.send(cmd).await.map_err(|_| RelayError::SessionClosed)
    }

    /// Adds a connection to the room and returns the full stroke history.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] when history cannot be loaded (the
    /// connection is not added in that case) or
    /// [`RelayError::SessionClosed`] when racing eviction.
    pub async fn join(
        &self,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<Vec<Stroke>, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join { conn, outbox, reply }).await?;
        rx.await.map_err(|_| RelayError::SessionClosed)?
    }

    /// Validates, persists, and broadcasts a stroke.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`RelayError::Store`] when the write
    /// fails (nothing is broadcast), or [`RelayError::SessionClosed`].
    pub async fn append(
        &self,
        conn: ConnectionId,
        draft: StrokeDraft,
    ) -> Result<Stroke, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Append { conn, draft, reply }).await?;
        rx.await.map_err(|_| RelayError::SessionClosed)?
    }

    /// Removes the connection's most recent stroke, if any.
    ///
    /// Returns the removed stroke's id, or `None` when the author has no
    /// strokes (no broadcast occurs in that case).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] or [`RelayError::SessionClosed`].
    pub async fn undo(&self, conn: ConnectionId) -> Result<Option<i64>, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Undo { conn, reply }).await?;
        rx.await.map_err(|_| RelayError::SessionClosed)?
    }

    /// Removes every stroke in the room. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] or [`RelayError::SessionClosed`].
    pub async fn clear(&self) -> Result<(), RelayError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Clear { reply }).await?;
        rx.await.map_err(|_| RelayError::SessionClosed)?
    }

    /// Removes the connection from the room's member set.
    ///
    /// Completes after any resulting eviction is visible in the registry.
    /// Leaving a room one is not a member of is a no-op.
    pub async fn leave(&self, conn: ConnectionId) {
        let (reply, rx) = oneshot::channel();
        if self.send(RoomCommand::Leave { conn, reply }).await.is_ok() {
            let _ = rx.await;
        }
    }
}

/// State owned by one room's actor task.
pub(crate) struct RoomSession {
    code: RoomCode,
    epoch: u64,
    inbox: mpsc::Receiver<RoomCommand>,
    store: SharedStrokeStore,
    registry: Weak<RoomRegistry>,
    broadcaster: Broadcaster,
    /// Cached stroke history, ascending by `created_at`. `None` until the
    /// first operation that needs it loads it from the store.
    strokes: Option<Vec<Stroke>>,
    max_stroke_width: u32,
}

impl RoomSession {
    pub(crate) fn new(
        code: RoomCode,
        epoch: u64,
        inbox: mpsc::Receiver<RoomCommand>,
        store: SharedStrokeStore,
        registry: Weak<RoomRegistry>,
        max_stroke_width: u32,
    ) -> Self {
        Self {
            code,
            epoch,
            inbox,
            store,
            registry,
            broadcaster: Broadcaster::new(),
            strokes: None,
            max_stroke_width,
        }
    }

    /// Drains the inbox until the room has no members left.
    ///
    /// Eviction happens before the triggering command's reply is sent, so
    /// a caller that has observed the reply also observes the registry
    /// entry gone.
    pub(crate) async fn run(mut self) {
        while let Some(cmd) = self.inbox.recv().await {
            let retired = match cmd {
                RoomCommand::Join { conn, outbox, reply } => {
                    let res = self.handle_join(conn, outbox).await;
                    let retired = self.maybe_retire().await;
                    let _ = reply.send(res);
                    retired
                }
                RoomCommand::Append { conn, draft, reply } => {
                    let res = self.handle_append(conn, draft).await;
                    let retired = self.maybe_retire().await;
                    let _ = reply.send(res);
                    retired
                }
                RoomCommand::Undo { conn, reply } => {
                    let res = self.handle_undo(conn).await;
                    let retired = self.maybe_retire().await;
                    let _ = reply.send(res);
                    retired
                }
                RoomCommand::Clear { reply } => {
                    let res = self.handle_clear().await;
                    let retired = self.maybe_retire().await;
                    let _ = reply.send(res);
                    retired
                }
                RoomCommand::Leave { conn, reply } => {
                    self.handle_leave(conn);
                    let retired = self.maybe_retire().await;
                    let _ = reply.send(());
                    retired
                }
            };
            if retired {
                return;
            }
        }
    }

    /// Retires the session if the room has no members. Returns `true`
    /// when the registry entry was given up.
    async fn maybe_retire(&self) -> bool {
        if !self.broadcaster.is_empty() {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.retire(&self.code, self.epoch).await;
        }
        true
    }

    /// Loads the persisted history into the cache on first need.
    async fn ensure_loaded(&mut self) -> Result<(), RelayError> {
        if self.strokes.is_none() {
            let history = self.store.list(&self.code).await?;
            tracing::debug!(room = %self.code, strokes = history.len(), "history loaded");
            self.strokes = Some(history);
        }
        Ok(())
    }

    fn strokes_mut(&mut self) -> &mut Vec<Stroke> {
        self.strokes.get_or_insert_with(Vec::new)
    }

    async fn handle_join(
        &mut self,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<Vec<Stroke>, RelayError> {
        // History must load before membership: a member without history
        // cannot replay the room.
        self.ensure_loaded().await?;
        let history = self.strokes_mut().clone();

        self.broadcaster.register(conn, outbox);
        self.broadcaster.publish(
            &RoomEvent::MemberJoined {
                author: conn,
                timestamp: Utc::now(),
            },
            Some(conn),
        );
        tracing::info!(room = %self.code, %conn, members = self.broadcaster.len(), "member joined");
        Ok(history)
    }

    async fn handle_append(
        &mut self,
        conn: ConnectionId,
        draft: StrokeDraft,
    ) -> Result<Stroke, RelayError> {
        draft.validate(self.max_stroke_width)?;
        self.ensure_loaded().await?;

        // Write-then-broadcast: a store failure aborts here, before any
        // member has seen the stroke.
        let stroke = self.store.insert(&self.code, conn, &draft).await?;
        self.strokes_mut().push(stroke.clone());
        self.broadcaster.publish(
            &RoomEvent::StrokeCommitted {
                stroke: stroke.clone(),
            },
            None,
        );
        tracing::debug!(room = %self.code, %conn, stroke_id = stroke.id, "stroke committed");
        Ok(stroke)
    }

    async fn handle_undo(&mut self, conn: ConnectionId) -> Result<Option<i64>, RelayError> {
        self.ensure_loaded().await?;

        // The cache is ascending by `created_at`, so the last matching
        // position is the author's most recent stroke.
        let Some(idx) = self.strokes_mut().iter().rposition(|s| s.author == conn) else {
            return Ok(None);
        };
        let Some(stroke_id) = self.strokes_mut().get(idx).map(|s| s.id) else {
            return Ok(None);
        };

        self.store.delete(stroke_id).await?;
        self.strokes_mut().remove(idx);
        self.broadcaster.publish(
            &RoomEvent::StrokeUndone {
                author: conn,
                stroke_id,
            },
            None,
        );
        tracing::debug!(room = %self.code, %conn, stroke_id, "stroke undone");
        Ok(Some(stroke_id))
    }

    async fn handle_clear(&mut self) -> Result<(), RelayError> {
        let removed = self.store.delete_room(&self.code).await?;
        self.strokes = Some(Vec::new());
        self.broadcaster.publish(&RoomEvent::Cleared, None);
        tracing::info!(room = %self.code, removed, "room cleared");
        Ok(())
    }

    fn handle_leave(&mut self, conn: ConnectionId) {
        if self.broadcaster.unregister(conn) {
            self.broadcaster.publish(
                &RoomEvent::MemberLeft {
                    author: conn,
                    timestamp: Utc::now(),
                },
                None,
            );
            tracing::info!(room = %self.code, %conn, members = self.broadcaster.len(), "member left");
        }
    }
}
