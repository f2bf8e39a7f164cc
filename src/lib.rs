//! # sketch-relay
//!
//! WebSocket synchronization engine for collaborative freehand drawing
//! rooms. Clients join a 6-character room, draw strokes, undo their own
//! latest stroke, or clear the room; the relay keeps an authoritative
//! per-room stroke history, persists it, and fans deltas out to every
//! room member so late joiners replay the exact committed order.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── Connection loop (ws/)
//!     │
//!     ├── RoomRegistry (domain/)
//!     ├── RoomSession actor per room (domain/)
//!     ├── Broadcaster per room (domain/)
//!     │
//!     └── StrokeStore (store/) — PostgreSQL
//! ```
//!
//! Each room is owned by one actor task; its FIFO inbox serializes all
//! mutations for that room while rooms stay fully parallel to each other.
//! Nothing is broadcast before its store write commits.

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod store;
pub mod ws;
