//! Shared application state for the API server.

use std::sync::Arc;

use idlemint_engine::cache::SnapshotCache;
use idlemint_engine::engine::EconomyEngine;
use idlemint_engine::store::EconomyStore;

/// Shared state handed to every handler.
///
/// Generic over the engine's storage and cache backends so the same
/// router serves the in-memory development setup and the
/// Postgres-plus-Redis deployment.
pub struct AppState<S, C> {
    /// The economy engine.
    pub engine: Arc<EconomyEngine<S, C>>,
}

impl<S, C> AppState<S, C>
where
    S: EconomyStore,
    C: SnapshotCache,
{
    /// Wrap an engine for sharing across handlers.
    pub fn new(engine: EconomyEngine<S, C>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

// Manual impl: `#[derive(Clone)]` would require `S: Clone + C: Clone`.
impl<S, C> Clone for AppState<S, C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}
