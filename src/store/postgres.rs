//! PostgreSQL implementation of the stroke store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::StrokeStore;
use crate::domain::{ConnectionId, Point, RoomCode, Stroke, StrokeDraft};
use crate::error::RelayError;

/// [`StrokeStore`] backed by `sqlx::PgPool`.
///
/// Strokes live in the `strokes` table with their points as JSONB; a
/// `rooms` row is upserted on a room's first stroke. Both tables are
/// created by the migrations in `migrations/`.
#[derive(Debug, Clone)]
pub struct PostgresStrokeStore {
    pool: PgPool,
}

impl PostgresStrokeStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type StrokeRow = (i64, Uuid, String, i32, serde_json::Value, DateTime<Utc>);

fn decode_row(room: &RoomCode, row: StrokeRow) -> Result<Stroke, RelayError> {
    let (id, author, color, width, points_json, created_at) = row;
    let points: Vec<Point> = serde_json::from_value(points_json)
        .map_err(|e| RelayError::Store(format!("corrupt points for stroke {id}: {e}")))?;
    let stroke_width = u32::try_from(width)
        .map_err(|_| RelayError::Store(format!("corrupt width for stroke {id}")))?;
    Ok(Stroke {
        id,
        room_code: room.clone(),
        author: ConnectionId::from_uuid(author),
        color,
        stroke_width,
        points,
        created_at,
    })
}

#[async_trait::async_trait]
impl StrokeStore for PostgresStrokeStore {
    async fn insert(
        &self,
        room: &RoomCode,
        author: ConnectionId,
        draft: &StrokeDraft,
    ) -> Result<Stroke, RelayError> {
        let width = i32::try_from(draft.stroke_width)
            .map_err(|_| RelayError::InvalidStroke("stroke width exceeds maximum"))?;
        let points_json = serde_json::to_value(&draft.points)
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        // Room bookkeeping: first stroke creates the room row.
        sqlx::query("INSERT INTO rooms (code) VALUES ($1) ON CONFLICT (code) DO NOTHING")
            .bind(room.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RelayError::Store(e.to_string()))?;

        let (id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO strokes (room_code, author_id, color, stroke_width, points) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id, created_at",
        )
        .bind(room.as_str())
        .bind(author.as_uuid())
        .bind(&draft.color)
        .bind(width)
        .bind(&points_json)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RelayError::Store(e.to_string()))?;

        Ok(Stroke {
            id,
            room_code: room.clone(),
            author,
            color: draft.color.clone(),
            stroke_width: draft.stroke_width,
            points: draft.points.clone(),
            created_at,
        })
    }

    async fn list(&self, room: &RoomCode) -> Result<Vec<Stroke>, RelayError> {
        let rows = sqlx::query_as::<_, StrokeRow>(
            "SELECT id, author_id, color, stroke_width, points, created_at \
             FROM strokes WHERE room_code = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(room.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Store(e.to_string()))?;

        rows.into_iter().map(|row| decode_row(room, row)).collect()
    }

    async fn delete(&self, id: i64) -> Result<(), RelayError> {
        sqlx::query("DELETE FROM strokes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RelayError::Store(e.to_string()))?;
        Ok(())
    }

    async fn delete_room(&self, room: &RoomCode) -> Result<u64, RelayError> {
        let result = sqlx::query("DELETE FROM strokes WHERE room_code = $1")
            .bind(room.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RelayError::Store(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
