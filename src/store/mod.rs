//! Stroke persistence layer.
//!
//! [`StrokeStore`] is the durable append/query/delete contract the room
//! sessions rely on. The production implementation is
//! [`postgres::PostgresStrokeStore`]; [`memory::MemoryStrokeStore`] backs
//! tests and store-less development.

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use crate::domain::{ConnectionId, RoomCode, Stroke, StrokeDraft};
use crate::error::RelayError;

/// Shared handle to a stroke store.
pub type SharedStrokeStore = Arc<dyn StrokeStore>;

/// Durable stroke storage, keyed by room.
///
/// The store is relied upon for durability, not coordination: per-room
/// ordering is enforced by the room sessions, which serialize all calls
/// for a given room. Implementations must assign `created_at` values that
/// are monotonically non-decreasing within a room under that discipline.
#[async_trait::async_trait]
pub trait StrokeStore: Send + Sync + fmt::Debug {
    /// Persists a validated draft, assigning its id and commit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] on storage failure.
    async fn insert(
        &self,
        room: &RoomCode,
        author: ConnectionId,
        draft: &StrokeDraft,
    ) -> Result<Stroke, RelayError>;

    /// Returns all strokes for a room, ascending by `created_at`
    /// (ties broken by id).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] on storage failure.
    async fn list(&self, room: &RoomCode) -> Result<Vec<Stroke>, RelayError>;

    /// Deletes a single stroke by id. Deleting an absent id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] on storage failure.
    async fn delete(&self, id: i64) -> Result<(), RelayError>;

    /// Deletes all strokes for a room, returning the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Store`] on storage failure.
    async fn delete_room(&self, room: &RoomCode) -> Result<u64, RelayError>;
}
