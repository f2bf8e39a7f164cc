//! Room registry: one live session per room code.
//!
//! [`RoomRegistry`] maps room codes to [`RoomHandle`]s, creating a session
//! actor on first use and dropping it again when its member set empties.
//! Lookups double-check under the write lock so concurrent `get_or_create`
//! calls for the same code converge on a single session; sessions for
//! different rooms run on independent tasks and never contend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{RwLock, mpsc};

use super::broadcaster::Outbox;
use super::connection_id::ConnectionId;
use super::room_code::RoomCode;
use super::session::{RoomHandle, RoomSession};
use super::stroke::{Stroke, StrokeDraft};
use crate::error::RelayError;
use crate::store::SharedStrokeStore;

/// How many times a command racing session eviction is retried.
const COMMAND_RETRIES: usize = 3;

/// Registry of live room sessions.
///
/// Holds a `Weak` reference to itself so that session tasks can retire
/// their own registry entry when their last member leaves; the entry's
/// creation epoch guards against a stale session evicting its successor.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    store: SharedStrokeStore,
    self_ref: Weak<Self>,
    inbox_capacity: usize,
    max_stroke_width: u32,
    next_epoch: AtomicU64,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        store: SharedStrokeStore,
        inbox_capacity: usize,
        max_stroke_width: u32,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            rooms: RwLock::new(HashMap::new()),
            store,
            self_ref: Weak::clone(weak),
            inbox_capacity,
            max_stroke_width,
            next_epoch: AtomicU64::new(0),
        })
    }

    /// Returns the live session for `code`, spawning one if none exists.
    pub async fn get_or_create(&self, code: &RoomCode) -> RoomHandle {
        if let Some(handle) = self.rooms.read().await.get(code) {
            return handle.clone();
        }

        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(code) {
            return handle.clone();
        }

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inbox_capacity);
        let session = RoomSession::new(
            code.clone(),
            epoch,
            rx,
            Arc::clone(&self.store),
            Weak::clone(&self.self_ref),
            self.max_stroke_width,
        );
        tokio::spawn(session.run());

        let handle = RoomHandle::new(tx, epoch);
        rooms.insert(code.clone(), handle.clone());
        tracing::debug!(room = %code, epoch, "room session created");
        handle
    }

    /// Removes the registry entry for `code` if it still belongs to the
    /// session identified by `epoch`. Called by the session itself when
    /// its member set empties.
    pub(crate) async fn retire(&self, code: &RoomCode, epoch: u64) {
        let mut rooms = self.rooms.write().await;
        if rooms.get(code).is_some_and(|h| h.epoch() == epoch) {
            rooms.remove(code);
            tracing::debug!(room = %code, epoch, "room session retired");
        }
    }

    /// Returns `true` if a session for `code` is currently live.
    pub async fn is_active(&self, code: &RoomCode) -> bool {
        self.rooms.read().await.contains_key(code)
    }

    /// Returns the number of live room sessions.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Joins `conn` to the room, returning its stroke history.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] when history cannot be loaded, or
    /// [`RelayError::SessionClosed`] when every retry raced an eviction.
    pub async fn join(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
        outbox: Outbox,
    ) -> Result<Vec<Stroke>, RelayError> {
        for _ in 0..COMMAND_RETRIES {
            let handle = self.get_or_create(code).await;
            match handle.join(conn, outbox.clone()).await {
                Err(RelayError::SessionClosed) => {}
                other => return other,
            }
        }
        Err(RelayError::SessionClosed)
    }

    /// Appends a stroke to the room.
    ///
    /// # Errors
    ///
    /// Returns a validation error, [`RelayError::Store`], or
    /// [`RelayError::SessionClosed`].
    pub async fn append(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
        draft: StrokeDraft,
    ) -> Result<Stroke, RelayError> {
        for _ in 0..COMMAND_RETRIES {
            let handle = self.get_or_create(code).await;
            match handle.append(conn, draft.clone()).await {
                Err(RelayError::SessionClosed) => {}
                other => return other,
            }
        }
        Err(RelayError::SessionClosed)
    }

    /// Undoes the connection's most recent stroke in the room.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] or [`RelayError::SessionClosed`].
    pub async fn undo(
        &self,
        code: &RoomCode,
        conn: ConnectionId,
    ) -> Result<Option<i64>, RelayError> {
        for _ in 0..COMMAND_RETRIES {
            let handle = self.get_or_create(code).await;
            match handle.undo(conn).await {
                Err(RelayError::SessionClosed) => {}
                other => return other,
            }
        }
        Err(RelayError::SessionClosed)
    }

    /// Clears the room's stroke history.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] or [`RelayError::SessionClosed`].
    pub async fn clear(&self, code: &RoomCode) -> Result<(), RelayError> {
        for _ in 0..COMMAND_RETRIES {
            let handle = self.get_or_create(code).await;
            match handle.clear().await {
                Err(RelayError::SessionClosed) => {}
                other => return other,
            }
        }
        Err(RelayError::SessionClosed)
    }

    /// Removes `conn` from the room's member set.
    ///
    /// A room with no live session has no members, so this is a no-op then.
    pub async fn leave(&self, code: &RoomCode, conn: ConnectionId) {
        let handle = self.rooms.read().await.get(code).cloned();
        if let Some(handle) = handle {
            handle.leave(conn).await;
        }
    }
}
