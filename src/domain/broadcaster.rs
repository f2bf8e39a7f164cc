//! Per-room event fan-out.
//!
//! Each room session owns one [`Broadcaster`] mapping member connections
//! to their outbound event channels. Delivery is fire-and-forget per
//! member: a full or closed channel is logged and skipped, never blocking
//! delivery to the remaining members.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::connection_id::ConnectionId;
use super::room_event::RoomEvent;

/// Sender half of a connection's outbound event channel.
pub type Outbox = mpsc::Sender<RoomEvent>;

/// Fan-out of [`RoomEvent`]s to the current members of one room.
///
/// Owned exclusively by the room session, so membership mutations are
/// already serialized with respect to publishes.
#[derive(Debug, Default)]
pub struct Broadcaster {
    members: HashMap<ConnectionId, Outbox>,
}

impl Broadcaster {
    /// Creates an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member's outbound channel, replacing any previous one.
    pub fn register(&mut self, conn: ConnectionId, outbox: Outbox) {
        self.members.insert(conn, outbox);
    }

    /// Removes a member. Returns `true` if the connection was a member.
    pub fn unregister(&mut self, conn: ConnectionId) -> bool {
        self.members.remove(&conn).is_some()
    }

    /// Delivers `event` to every member except `exclude`.
    ///
    /// Uses `try_send` so a slow member can never stall the room. Returns
    /// the number of members the event was handed to.
    pub fn publish(&self, event: &RoomEvent, exclude: Option<ConnectionId>) -> usize {
        let mut delivered = 0;
        for (conn, outbox) in &self.members {
            if Some(*conn) == exclude {
                continue;
            }
            match outbox.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%conn, kind = event.kind(), "outbound buffer full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%conn, kind = event.kind(), "outbound channel closed");
                }
            }
        }
        delivered
    }

    /// Returns the number of current members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the room has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
