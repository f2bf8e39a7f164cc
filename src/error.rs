//! Central error type for the relay.
//!
//! [`RelayError`] covers every failure surfaced by the synchronization
//! engine. Client-facing messages go through [`RelayError::client_message`]
//! so that store internals never leak over the wire.

/// Server-side error enum for all room operations.
///
/// # Error categories
///
/// | Variant           | Category   | Client-visible detail      |
/// |-------------------|------------|----------------------------|
/// | `InvalidRoomCode` | Validation | full message               |
/// | `InvalidStroke`   | Validation | full message               |
/// | `Store`           | Storage    | generic "storage failure"  |
/// | `SessionClosed`   | Lifecycle  | generic retry notice       |
/// | `Internal`        | Server     | generic "internal error"   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Room code is not 6 uppercase alphanumeric characters.
    #[error("invalid room code: {0}")]
    InvalidRoomCode(String),

    /// Stroke draft failed validation (too few points, width out of range).
    #[error("invalid stroke: {0}")]
    InvalidStroke(&'static str),

    /// Stroke store failure (insert/query/delete).
    #[error("store error: {0}")]
    Store(String),

    /// The room session's inbox closed while a command was in flight.
    ///
    /// Commands racing session eviction observe this; the registry retries
    /// them against a fresh session.
    #[error("room session closed")]
    SessionClosed,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the message that may be sent to the originating client.
    ///
    /// Validation errors are self-describing and safe to forward verbatim.
    /// Store and internal errors are reduced to a generic message; the
    /// detail stays in the server logs.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidRoomCode(_) | Self::InvalidStroke(_) => self.to_string(),
            Self::Store(_) => "storage failure".to_string(),
            Self::SessionClosed => "room unavailable, retry".to_string(),
            Self::Internal(_) => "internal error".to_string(),
        }
    }
}
