//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::RoomRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registry of live room sessions; owns the stroke store.
    pub registry: Arc<RoomRegistry>,
    /// Capacity of each connection's outbound event buffer.
    pub outbound_buffer: usize,
}
