//! WebSocket transport layer: upgrade handling, connection loop, and
//! wire message types.
//!
//! The endpoint at `/ws` is the only client-facing surface of the relay;
//! every room operation arrives and leaves as a JSON frame on it.

pub mod connection;
pub mod handler;
pub mod messages;
