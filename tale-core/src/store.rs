//! In-memory story store.
//!
//! The store is the only shared mutable state in the system: the
//! continuation engine appends pages while background enrichment tasks
//! patch illustrations into the same record. Every mutation runs in place
//! under a single write-lock acquisition, so an append can never discard a
//! patch that landed between a read and a write — there is no
//! read-modify-write across two lock round trips.

use crate::story::{Page, Story, StoryId};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("story not found")]
    NotFound,

    #[error("story identifier collision")]
    Allocation,
}

/// Handle to the shared story map. Cheap to clone.
#[derive(Clone, Default)]
pub struct StoryStore {
    stories: Arc<RwLock<HashMap<StoryId, Story>>>,
}

impl StoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new story under a freshly allocated identifier.
    ///
    /// The story's existing id is replaced. Fails only on an identifier
    /// collision, which v4 identifiers make practically impossible.
    pub async fn create(&self, mut story: Story) -> Result<StoryId, StoreError> {
        let id = StoryId::new();
        let mut stories = self.stories.write().await;
        if stories.contains_key(&id) {
            return Err(StoreError::Allocation);
        }
        story.id = id;
        stories.insert(id, story);
        Ok(id)
    }

    /// Snapshot of the current story state.
    pub async fn get(&self, id: &StoryId) -> Result<Story, StoreError> {
        let stories = self.stories.read().await;
        stories.get(id).cloned().ok_or(StoreError::NotFound)
    }

    /// Atomically clear the tail page's options and append `new_pages`.
    ///
    /// Returns the updated snapshot. Holding the write lock for both steps
    /// keeps the append atomic with respect to concurrent illustration
    /// patches on the same story.
    pub async fn append_pages(
        &self,
        id: &StoryId,
        new_pages: Vec<Page>,
    ) -> Result<Story, StoreError> {
        let mut stories = self.stories.write().await;
        let story = stories.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(last) = story.pages.last_mut() {
            last.options = None;
        }
        story.pages.extend(new_pages);
        Ok(story.clone())
    }

    /// Set the illustration field of one page, touching nothing else.
    ///
    /// A no-op when the story or page no longer exists: retention is an
    /// external policy concern and a late-arriving illustration for an
    /// evicted story is not an error.
    pub async fn patch_illustration(
        &self,
        id: &StoryId,
        page_index: usize,
        image_url: impl Into<String>,
    ) {
        let mut stories = self.stories.write().await;
        if let Some(story) = stories.get_mut(id) {
            if let Some(page) = story.pages.get_mut(page_index) {
                page.image_url = Some(image_url.into());
            }
        }
    }

    /// Number of stories currently held.
    pub async fn len(&self) -> usize {
        self.stories.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
