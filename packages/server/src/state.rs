//! Shared application state.

use std::sync::Arc;

use gavel_shared::time::Clock;

use crate::registry::ConnectionRegistry;

/// State handed to every handler.
pub struct AppState {
    /// All live connections and auction rooms.
    pub registry: Arc<ConnectionRegistry>,
    /// Injected clock so handlers and tests share one notion of time.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(registry: Arc<ConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }
}
