//! Domain events delivered to room members.
//!
//! A [`RoomEvent`] is what a room session hands to its
//! [`super::Broadcaster`] after a mutation commits (or on a membership
//! change). The transport layer converts events into wire messages; the
//! domain layer knows nothing about the wire format.

use chrono::{DateTime, Utc};

use super::connection_id::ConnectionId;
use super::stroke::Stroke;

/// Event fanned out to the members of one room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A stroke was persisted and appended to the room history.
    StrokeCommitted {
        /// The committed stroke, including store-assigned id and timestamp.
        stroke: Stroke,
    },

    /// The author's most recent stroke was removed.
    StrokeUndone {
        /// Author whose stroke was undone.
        author: ConnectionId,
        /// Store id of the removed stroke.
        stroke_id: i64,
    },

    /// All strokes in the room were removed.
    Cleared,

    /// A connection joined the room. Advisory presence, no state change.
    MemberJoined {
        /// The joining connection.
        author: ConnectionId,
        /// Server time of the join.
        timestamp: DateTime<Utc>,
    },

    /// A connection left the room. Advisory presence, no state change.
    MemberLeft {
        /// The departing connection.
        author: ConnectionId,
        /// Server time of the departure.
        timestamp: DateTime<Utc>,
    },
}

impl RoomEvent {
    /// Returns the event kind as a static string slice, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StrokeCommitted { .. } => "stroke_committed",
            Self::StrokeUndone { .. } => "stroke_undone",
            Self::Cleared => "cleared",
            Self::MemberJoined { .. } => "member_joined",
            Self::MemberLeft { .. } => "member_left",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        let event = RoomEvent::StrokeUndone {
            author: ConnectionId::new(),
            stroke_id: 1,
        };
        assert_eq!(event.kind(), "stroke_undone");
        assert_eq!(RoomEvent::Cleared.kind(), "cleared");
    }
}
