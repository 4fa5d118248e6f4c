//! Shared server state.

use std::collections::HashMap;
use std::sync::Arc;
use tale_core::{ContinuationEngine, EnrichmentScheduler, StoryId, StoryStore};
use tokio::sync::Mutex;

/// State shared by every request handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: StoryStore,
    pub engine: Arc<ContinuationEngine>,
    pub scheduler: EnrichmentScheduler,
    continuation_locks: Arc<Mutex<HashMap<StoryId, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(
        store: StoryStore,
        engine: Arc<ContinuationEngine>,
        scheduler: EnrichmentScheduler,
    ) -> Self {
        Self {
            store,
            engine,
            scheduler,
            continuation_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Per-story lock serializing continuation calls.
    ///
    /// A double-submitted continue would otherwise race: both readers see
    /// the same tail page, both append. Holding this lock across the
    /// validate-and-append sequence makes the loser fail validation
    /// instead. Locks are never reclaimed; one entry per story is small
    /// next to the story itself.
    pub async fn continuation_lock(&self, id: StoryId) -> Arc<Mutex<()>> {
        let mut locks = self.continuation_locks.lock().await;
        locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
