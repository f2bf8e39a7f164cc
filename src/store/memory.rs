//! In-memory stroke store for tests and store-less development.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::StrokeStore;
use crate::domain::{ConnectionId, RoomCode, Stroke, StrokeDraft};
use crate::error::RelayError;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    last_created_at: Option<DateTime<Utc>>,
    rows: Vec<Stroke>,
    fail_next: bool,
}

/// [`StrokeStore`] backed by a `Vec` behind a [`Mutex`].
///
/// Ids are sequence-assigned; `created_at` is clamped to be monotonically
/// non-decreasing across inserts. Supports single-shot fault injection via
/// [`MemoryStrokeStore::fail_next_op`], so tests can assert the
/// no-broadcast-on-store-failure rule.
#[derive(Debug, Default)]
pub struct MemoryStrokeStore {
    inner: Mutex<Inner>,
}

impl MemoryStrokeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next store operation fail with [`RelayError::Store`].
    pub async fn fail_next_op(&self) {
        self.inner.lock().await.fail_next = true;
    }

    /// Returns the number of persisted strokes for a room.
    pub async fn stroke_count(&self, room: &RoomCode) -> usize {
        self.inner
            .lock()
            .await
            .rows
            .iter()
            .filter(|s| s.room_code == *room)
            .count()
    }
}

impl Inner {
    fn check_fault(&mut self) -> Result<(), RelayError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(RelayError::Store("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StrokeStore for MemoryStrokeStore {
    async fn insert(
        &self,
        room: &RoomCode,
        author: ConnectionId,
        draft: &StrokeDraft,
    ) -> Result<Stroke, RelayError> {
        let mut inner = self.inner.lock().await;
        inner.check_fault()?;

        inner.next_id += 1;
        let now = Utc::now();
        let created_at = match inner.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        };
        inner.last_created_at = Some(created_at);

        let stroke = Stroke {
            id: inner.next_id,
            room_code: room.clone(),
            author,
            color: draft.color.clone(),
            stroke_width: draft.stroke_width,
            points: draft.points.clone(),
            created_at,
        };
        inner.rows.push(stroke.clone());
        Ok(stroke)
    }

    async fn list(&self, room: &RoomCode) -> Result<Vec<Stroke>, RelayError> {
        let mut inner = self.inner.lock().await;
        inner.check_fault()?;

        let mut strokes: Vec<Stroke> = inner
            .rows
            .iter()
            .filter(|s| s.room_code == *room)
            .cloned()
            .collect();
        strokes.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(strokes)
    }

    async fn delete(&self, id: i64) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().await;
        inner.check_fault()?;
        inner.rows.retain(|s| s.id != id);
        Ok(())
    }

    async fn delete_room(&self, room: &RoomCode) -> Result<u64, RelayError> {
        let mut inner = self.inner.lock().await;
        inner.check_fault()?;
        let before = inner.rows.len();
        inner.rows.retain(|s| s.room_code != *room);
        Ok((before - inner.rows.len()) as u64)
    }
}
