//! Domain layer: room identity, stroke model, sessions, and fan-out.
//!
//! This module contains the synchronization core: validated room codes,
//! per-connection identity, the stroke data model, the per-room session
//! actor with its broadcaster, and the registry that maps room codes to
//! live sessions.

pub mod broadcaster;
pub mod connection_id;
pub mod registry;
pub mod room_code;
pub mod room_event;
pub mod session;
pub mod stroke;

pub use broadcaster::{Broadcaster, Outbox};
pub use connection_id::ConnectionId;
pub use registry::RoomRegistry;
pub use room_code::RoomCode;
pub use room_event::RoomEvent;
pub use session::RoomHandle;
pub use stroke::{Point, Stroke, StrokeDraft};
