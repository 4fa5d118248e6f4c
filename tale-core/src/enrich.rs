//! Background illustration enrichment.
//!
//! Enrichment is fire-and-forget from the request path: the continuation
//! engine has already responded by the time any task here runs. Each task
//! illustrates one page, bounded by a shared semaphore and a per-task
//! timeout, and converges its page to either the real image URL or the
//! configured placeholder. Failure never propagates — the worst outcome
//! for a page is the placeholder, never a broken story.

use crate::provider::{illustration_prompt, SharedIllustrator};
use crate::store::StoryStore;
use crate::story::StoryId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Scheduler tuning. The timeout and concurrency bound are deployment
/// configuration, not constants.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Per-task provider timeout. A hung provider resolves to the
    /// placeholder after this long instead of leaving the page pending.
    pub timeout: Duration,

    /// Maximum illustration tasks running concurrently.
    pub max_concurrent: usize,

    /// Illustration reference patched in when a task fails or times out.
    pub placeholder: String,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrent: 4,
            placeholder: "/images/placeholder.jpg".to_string(),
        }
    }
}

impl EnrichConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

/// Schedules per-page illustration tasks. Cheap to clone; clones share the
/// semaphore and the in-flight set.
#[derive(Clone)]
pub struct EnrichmentScheduler {
    illustrator: SharedIllustrator,
    store: StoryStore,
    config: EnrichConfig,
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<(StoryId, usize)>>>,
}

impl EnrichmentScheduler {
    pub fn new(illustrator: SharedIllustrator, store: StoryStore) -> Self {
        let config = EnrichConfig::default();
        Self {
            illustrator,
            store,
            permits: Arc::new(Semaphore::new(config.max_concurrent)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            config,
        }
    }

    pub fn with_config(mut self, config: EnrichConfig) -> Self {
        self.permits = Arc::new(Semaphore::new(config.max_concurrent));
        self.config = config;
        self
    }

    /// Enqueue one task per page index in the half-open range.
    ///
    /// Tasks run independently and may complete in any order. Must be
    /// called from within a tokio runtime.
    pub fn enqueue_range(&self, id: StoryId, from: usize, to: usize) {
        for index in from..to {
            self.enqueue(id, index);
        }
    }

    /// Enqueue a single page, skipping it when a task for the same
    /// (story, page) pair is already in flight.
    pub fn enqueue(&self, id: StoryId, index: usize) {
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight set poisoned");
            if !in_flight.insert((id, index)) {
                debug!(story = %id, page = index, "illustration task already in flight, skipping");
                return;
            }
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_task(id, index).await;
            scheduler
                .in_flight
                .lock()
                .expect("in-flight set poisoned")
                .remove(&(id, index));
        });
    }

    /// Number of tasks currently in flight (enqueued or running).
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().expect("in-flight set poisoned").len()
    }

    async fn run_task(&self, id: StoryId, index: usize) {
        let Ok(_permit) = self.permits.acquire().await else {
            return; // scheduler dropped mid-flight
        };

        // Read the page fresh under the permit; the story may have grown
        // or vanished since enqueue.
        let Ok(story) = self.store.get(&id).await else {
            debug!(story = %id, page = index, "story gone before illustration, dropping task");
            return;
        };
        let Some(page) = story.pages.get(index) else {
            debug!(story = %id, page = index, "page gone before illustration, dropping task");
            return;
        };

        let scene = page.image_prompt.as_deref().unwrap_or(&page.content);
        let prompt = illustration_prompt(scene);

        let url = match tokio::time::timeout(
            self.config.timeout,
            self.illustrator.illustrate(&prompt),
        )
        .await
        {
            Ok(Ok(url)) => {
                info!(story = %id, page = index, url = %url, "illustration ready");
                url
            }
            Ok(Err(e)) => {
                warn!(story = %id, page = index, error = %e, "illustration failed, using placeholder");
                self.config.placeholder.clone()
            }
            Err(_) => {
                warn!(story = %id, page = index, timeout = ?self.config.timeout, "illustration timed out, using placeholder");
                self.config.placeholder.clone()
            }
        };

        self.store.patch_illustration(&id, index, url).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::fallback_story;
    use crate::testing::MockIllustrator;
    use std::sync::Arc;
    use std::time::Duration;

    async fn seeded_store() -> (StoryStore, StoryId) {
        let store = StoryStore::new();
        let id = store
            .create(fallback_story("Mia", 6, "dinosaurs"))
            .await
            .unwrap();
        (store, id)
    }

    /// Poll until the page range is no longer pending or the budget runs out.
    async fn wait_enriched(store: &StoryStore, id: &StoryId, from: usize, to: usize) {
        for _ in 0..200 {
            let story = store.get(id).await.unwrap();
            if (from..to).all(|i| !story.pages[i].is_pending()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pages {from}..{to} never became ready");
    }

    #[tokio::test]
    async fn test_range_converges_out_of_order_tasks() {
        let (store, id) = seeded_store().await;
        let illustrator = Arc::new(MockIllustrator::ok("/uploads/ok.jpg"));
        let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

        scheduler.enqueue_range(id, 0, 5);
        wait_enriched(&store, &id, 0, 5).await;

        let story = store.get(&id).await.unwrap();
        assert!(story.pending_pages().is_empty());
        assert_eq!(illustrator.calls(), 5);
        for page in &story.pages {
            assert_eq!(page.image_url.as_deref(), Some("/uploads/ok.jpg"));
        }
    }

    #[tokio::test]
    async fn test_failure_patches_placeholder_only_on_failed_page() {
        let (store, id) = seeded_store().await;
        // Fails on the second call only.
        let illustrator = Arc::new(MockIllustrator::ok("/uploads/ok.jpg").failing_on(2));
        let scheduler = EnrichmentScheduler::new(illustrator, store.clone())
            .with_config(EnrichConfig::default().with_max_concurrent(1));

        scheduler.enqueue_range(id, 0, 3);
        wait_enriched(&store, &id, 0, 3).await;

        let story = store.get(&id).await.unwrap();
        assert_eq!(story.pages[0].image_url.as_deref(), Some("/uploads/ok.jpg"));
        assert_eq!(
            story.pages[1].image_url.as_deref(),
            Some("/images/placeholder.jpg")
        );
        assert_eq!(story.pages[2].image_url.as_deref(), Some("/uploads/ok.jpg"));
        // Untouched pages keep their fields.
        assert!(story.pages[3].is_pending());
        assert!(story.pages[4].is_pending());
    }

    #[tokio::test]
    async fn test_timeout_patches_placeholder() {
        let (store, id) = seeded_store().await;
        let illustrator = Arc::new(MockIllustrator::hanging());
        let scheduler = EnrichmentScheduler::new(illustrator, store.clone()).with_config(
            EnrichConfig::default().with_timeout(Duration::from_millis(50)),
        );

        scheduler.enqueue(id, 2);
        wait_enriched(&store, &id, 2, 3).await;

        let story = store.get(&id).await.unwrap();
        assert_eq!(
            story.pages[2].image_url.as_deref(),
            Some("/images/placeholder.jpg")
        );
        for i in [0, 1, 3, 4] {
            assert!(story.pages[i].is_pending());
        }
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_is_suppressed() {
        let (store, id) = seeded_store().await;
        let illustrator = Arc::new(MockIllustrator::slow(
            "/uploads/ok.jpg",
            Duration::from_millis(100),
        ));
        let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

        scheduler.enqueue(id, 0);
        scheduler.enqueue(id, 0);
        scheduler.enqueue(id, 0);
        wait_enriched(&store, &id, 0, 1).await;

        assert_eq!(illustrator.calls(), 1);
    }

    #[tokio::test]
    async fn test_reenqueue_after_completion_overwrites() {
        let (store, id) = seeded_store().await;
        let illustrator = Arc::new(MockIllustrator::ok("/uploads/one.jpg"));
        let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

        scheduler.enqueue(id, 0);
        wait_enriched(&store, &id, 0, 1).await;
        while scheduler.in_flight_count() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Permitted: acceptable waste, not a correctness hazard.
        scheduler.enqueue(id, 0);
        for _ in 0..200 {
            if illustrator.calls() == 2 && scheduler.in_flight_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(illustrator.calls(), 2);
        assert_eq!(
            store.get(&id).await.unwrap().pages[0].image_url.as_deref(),
            Some("/uploads/one.jpg")
        );
    }

    #[tokio::test]
    async fn test_missing_story_drops_task_silently() {
        let store = StoryStore::new();
        let illustrator = Arc::new(MockIllustrator::ok("/uploads/ok.jpg"));
        let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

        scheduler.enqueue(StoryId::new(), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(illustrator.calls(), 0);
        assert_eq!(scheduler.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_page_drops_task_silently() {
        let (store, id) = seeded_store().await;
        let illustrator = Arc::new(MockIllustrator::ok("/uploads/ok.jpg"));
        let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

        scheduler.enqueue(id, 99);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(illustrator.calls(), 0);
        assert!(store.get(&id).await.unwrap().pending_pages().len() == 5);
    }
}
