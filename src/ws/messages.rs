//! Wire messages: JSON envelopes exchanged with drawing clients.
//!
//! Every frame is `{"event": "<kebab-case name>", "data": <payload>}`.
//! Field names are camelCase (`roomCode`, `userId`, `strokeWidth`) to
//! match the drawing clients' wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionId, RoomEvent, Stroke, StrokeDraft};

/// Client → server messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Join a room; payload is the room code.
    JoinRoom(String),
    /// Append a stroke to a room.
    Draw(DrawRequest),
    /// Undo the sender's most recent stroke in a room.
    Undo(UndoRequest),
    /// Remove every stroke in a room; payload is the room code.
    Clear(String),
    /// Leave a room; payload is the room code.
    LeaveRoom(String),
}

/// Payload of an inbound `draw` message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    /// Target room.
    pub room_code: String,
    /// The stroke to append.
    pub line: StrokeDraft,
}

/// Payload of an inbound `undo` message.
///
/// Clients send their own `userId` out of habit; the server always uses
/// the connection's identity instead, so the field cannot be spoofed to
/// undo someone else's stroke.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoRequest {
    /// Target room.
    pub room_code: String,
    /// Client-claimed identity; ignored for authorization.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Server → client messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Full stroke history, sent once to a joining connection.
    LoadDrawings(Vec<Stroke>),
    /// A committed stroke, broadcast to all room members.
    Draw(DrawBroadcast),
    /// A stroke was undone, broadcast to all room members.
    Undo(UndoBroadcast),
    /// The room was cleared, broadcast to all room members.
    Clear,
    /// A connection joined the room (presence only).
    UserJoined(Presence),
    /// A connection left the room (presence only).
    UserLeft(Presence),
    /// Operation-scoped error, sent to the originator only.
    Error(String),
}

/// Payload of an outbound `draw` broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawBroadcast {
    /// The committed stroke.
    pub line: Stroke,
    /// The stroke's author.
    pub user_id: ConnectionId,
}

/// Payload of an outbound `undo` broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoBroadcast {
    /// Author whose stroke was undone.
    pub user_id: ConnectionId,
    /// Id of the removed stroke.
    pub drawing_id: i64,
}

/// Payload of `user-joined` / `user-left` presence messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    /// The connection that joined or left.
    pub user_id: ConnectionId,
    /// Server time of the membership change.
    pub timestamp: DateTime<Utc>,
}

impl From<RoomEvent> for ServerMessage {
    fn from(event: RoomEvent) -> Self {
        match event {
            RoomEvent::StrokeCommitted { stroke } => {
                let user_id = stroke.author;
                Self::Draw(DrawBroadcast {
                    line: stroke,
                    user_id,
                })
            }
            RoomEvent::StrokeUndone { author, stroke_id } => Self::Undo(UndoBroadcast {
                user_id: author,
                drawing_id: stroke_id,
            }),
            RoomEvent::Cleared => Self::Clear,
            RoomEvent::MemberJoined { author, timestamp } => Self::UserJoined(Presence {
                user_id: author,
                timestamp,
            }),
            RoomEvent::MemberLeft { author, timestamp } => Self::UserLeft(Presence {
                user_id: author,
                timestamp,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Point, RoomCode};

    #[test]
    fn parses_join_room() {
        let Ok(msg) =
            serde_json::from_str::<ClientMessage>(r#"{"event":"join-room","data":"abc123"}"#)
        else {
            panic!("expected join-room to parse");
        };
        assert!(matches!(msg, ClientMessage::JoinRoom(code) if code == "abc123"));
    }

    #[test]
    fn parses_draw_with_camel_case_fields() {
        let json = r##"{"event":"draw","data":{"roomCode":"ABC123","line":{"color":"#ff0000","strokeWidth":5,"points":[{"x":0,"y":0},{"x":5,"y":5}]}}}"##;
        let Ok(ClientMessage::Draw(req)) = serde_json::from_str::<ClientMessage>(json) else {
            panic!("expected draw to parse");
        };
        assert_eq!(req.room_code, "ABC123");
        assert_eq!(req.line.stroke_width, 5);
        assert_eq!(req.line.points.len(), 2);
    }

    #[test]
    fn parses_undo_with_and_without_user_id() {
        let with = r#"{"event":"undo","data":{"roomCode":"ABC123","userId":"whatever"}}"#;
        let Ok(ClientMessage::Undo(req)) = serde_json::from_str::<ClientMessage>(with) else {
            panic!("expected undo to parse");
        };
        assert_eq!(req.user_id.as_deref(), Some("whatever"));

        let without = r#"{"event":"undo","data":{"roomCode":"ABC123"}}"#;
        let Ok(ClientMessage::Undo(req)) = serde_json::from_str::<ClientMessage>(without) else {
            panic!("expected undo to parse");
        };
        assert!(req.user_id.is_none());
    }

    #[test]
    fn rejects_unknown_event() {
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"event":"resize","data":"ABC123"}"#).is_err()
        );
    }

    #[test]
    fn clear_serializes_without_data() {
        let Ok(json) = serde_json::to_string(&ServerMessage::Clear) else {
            panic!("serialization failed");
        };
        assert_eq!(json, r#"{"event":"clear"}"#);
    }

    #[test]
    fn error_serializes_as_plain_string_payload() {
        let Ok(json) = serde_json::to_string(&ServerMessage::Error("storage failure".to_string()))
        else {
            panic!("serialization failed");
        };
        assert_eq!(json, r#"{"event":"error","data":"storage failure"}"#);
    }

    #[test]
    fn stroke_committed_maps_to_draw_broadcast() {
        let Ok(code) = "ABC123".parse::<RoomCode>() else {
            panic!("valid code");
        };
        let author = ConnectionId::new();
        let stroke = Stroke {
            id: 9,
            room_code: code,
            author,
            color: "#123456".to_string(),
            stroke_width: 2,
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            created_at: Utc::now(),
        };
        let msg = ServerMessage::from(RoomEvent::StrokeCommitted { stroke });
        let Ok(json) = serde_json::to_string(&msg) else {
            panic!("serialization failed");
        };
        assert!(json.starts_with(r#"{"event":"draw""#));
        assert!(json.contains(&format!("\"userId\":\"{author}\"")));
        assert!(json.contains("\"line\""));
    }

    #[test]
    fn stroke_undone_maps_to_undo_broadcast() {
        let author = ConnectionId::new();
        let msg = ServerMessage::from(RoomEvent::StrokeUndone {
            author,
            stroke_id: 42,
        });
        let Ok(json) = serde_json::to_string(&msg) else {
            panic!("serialization failed");
        };
        assert!(json.starts_with(r#"{"event":"undo""#));
        assert!(json.contains("\"drawingId\":42"));
    }

    #[test]
    fn presence_carries_timestamp() {
        let msg = ServerMessage::from(RoomEvent::MemberJoined {
            author: ConnectionId::new(),
            timestamp: Utc::now(),
        });
        let Ok(json) = serde_json::to_string(&msg) else {
            panic!("serialization failed");
        };
        assert!(json.starts_with(r#"{"event":"user-joined""#));
        assert!(json.contains("\"timestamp\""));
    }
}
