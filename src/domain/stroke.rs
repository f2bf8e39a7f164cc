//! Stroke data model: points, client drafts, and committed strokes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::connection_id::ConnectionId;
use super::room_code::RoomCode;
use crate::error::RelayError;

/// Minimum number of points in an accepted stroke.
pub const MIN_STROKE_POINTS: usize = 2;

/// A sampled pointer location in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A client-submitted stroke, not yet validated or persisted.
///
/// Unknown fields from the client (e.g. a client-side `userId`) are
/// ignored on deserialization; the server assigns its own identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeDraft {
    /// RGB color, as sent by the client (e.g. `"#ff0000"`).
    pub color: String,
    /// Brush width in canvas pixels.
    pub stroke_width: u32,
    /// Sampled pointer path, in drawing order.
    pub points: Vec<Point>,
}

impl StrokeDraft {
    /// Validates the draft against the room's acceptance rules.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidStroke`] when the stroke has fewer
    /// than [`MIN_STROKE_POINTS`] points or its width is outside
    /// `1..=max_width`.
    pub fn validate(&self, max_width: u32) -> Result<(), RelayError> {
        if self.points.len() < MIN_STROKE_POINTS {
            return Err(RelayError::InvalidStroke("stroke needs at least 2 points"));
        }
        if self.stroke_width == 0 {
            return Err(RelayError::InvalidStroke("stroke width must be positive"));
        }
        if self.stroke_width > max_width {
            return Err(RelayError::InvalidStroke("stroke width exceeds maximum"));
        }
        Ok(())
    }
}

/// A committed stroke: immutable once broadcast.
///
/// `id` and `created_at` are assigned by the stroke store at persistence
/// time. `created_at` is monotonically non-decreasing within a room and is
/// the sole ordering key for history replay and undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Store-assigned identifier, unique across all rooms.
    pub id: i64,
    /// Room this stroke belongs to.
    pub room_code: RoomCode,
    /// Connection that drew the stroke.
    #[serde(rename = "userId")]
    pub author: ConnectionId,
    /// RGB color.
    pub color: String,
    /// Brush width in canvas pixels.
    pub stroke_width: u32,
    /// Sampled pointer path, in drawing order.
    pub points: Vec<Point>,
    /// Server-assigned commit timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn draft(points: usize, width: u32) -> StrokeDraft {
        StrokeDraft {
            color: "#ff0000".to_string(),
            stroke_width: width,
            points: (0..points)
                .map(|i| {
                    let c = f64::from(u32::try_from(i).unwrap_or(0));
                    Point { x: c, y: c * 2.0 }
                })
                .collect(),
        }
    }

    #[test]
    fn accepts_two_point_stroke() {
        assert!(draft(2, 5).validate(50).is_ok());
    }

    #[test]
    fn rejects_single_point() {
        assert!(draft(1, 5).validate(50).is_err());
        assert!(draft(0, 5).validate(50).is_err());
    }

    #[test]
    fn rejects_width_out_of_range() {
        assert!(draft(3, 0).validate(50).is_err());
        assert!(draft(3, 51).validate(50).is_err());
        assert!(draft(3, 50).validate(50).is_ok());
    }

    #[test]
    fn draft_ignores_unknown_client_fields() {
        let json = r##"{"color":"#00ff00","strokeWidth":4,"points":[{"x":0,"y":0},{"x":1,"y":1}],"userId":"client-junk"}"##;
        let Ok(draft) = serde_json::from_str::<StrokeDraft>(json) else {
            panic!("expected draft to parse");
        };
        assert_eq!(draft.stroke_width, 4);
        assert_eq!(draft.points.len(), 2);
    }

    #[test]
    fn stroke_serializes_camel_case() {
        let Ok(code) = "ABC123".parse::<RoomCode>() else {
            panic!("valid code");
        };
        let stroke = Stroke {
            id: 7,
            room_code: code,
            author: ConnectionId::new(),
            color: "#000000".to_string(),
            stroke_width: 3,
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            created_at: Utc::now(),
        };
        let Ok(json) = serde_json::to_string(&stroke) else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"roomCode\":\"ABC123\""));
        assert!(json.contains("\"strokeWidth\":3"));
        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"createdAt\""));
    }
}
