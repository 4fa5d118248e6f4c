//! Client-facing synchronization contract.
//!
//! A story is published before its illustrations exist. Clients observe
//! per-page states derived from the snapshot: `Pending` while the
//! illustration is absent, `Ready` once any reference is present — a
//! placeholder counts as ready, since the page is navigable either way
//! and the protocol deliberately does not distinguish the two.
//!
//! The polling policy is the client's job, but it is load-bearing for UX
//! correctness, so [`await_enrichment`] packages it for embedding clients
//! and tests: re-fetch on a fixed interval until no page of interest is
//! pending, or a deadline passes.

use crate::store::{StoreError, StoryStore};
use crate::story::{Story, StoryId};
use std::ops::Range;
use std::time::Duration;
use tokio::time::Instant;

/// Observed convention for client re-fetch intervals.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Per-page synchronization state as seen by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSync {
    /// Illustration absent; do not navigate here yet.
    Pending,
    /// Illustration (or placeholder) present; terminal for this page.
    Ready,
}

/// Current snapshot of a story, however many pages are still pending.
pub async fn fetch(store: &StoryStore, id: &StoryId) -> Result<Story, StoreError> {
    store.get(id).await
}

/// Synchronization state for every page, in page order.
pub fn sync_states(story: &Story) -> Vec<PageSync> {
    story
        .pages
        .iter()
        .map(|page| {
            if page.is_pending() {
                PageSync::Pending
            } else {
                PageSync::Ready
            }
        })
        .collect()
}

/// Whether no page is still awaiting its illustration.
pub fn is_fully_enriched(story: &Story) -> bool {
    story.pending_pages().is_empty()
}

/// Navigation gating: a reader may land on `index` only when the page
/// exists and its illustration is no longer pending. The page a reader is
/// already on may render in a pending state; this guards movement.
pub fn can_navigate_to(story: &Story, index: usize) -> bool {
    story.pages.get(index).is_some_and(|page| !page.is_pending())
}

/// Poll the store until no page in `range` is pending, or `deadline`
/// elapses. Returns the last observed snapshot either way; callers can
/// re-check [`is_fully_enriched`] if they need to know which happened.
pub async fn await_enrichment(
    store: &StoryStore,
    id: &StoryId,
    range: Range<usize>,
    interval: Duration,
    deadline: Duration,
) -> Result<Story, StoreError> {
    let started = Instant::now();
    loop {
        let story = store.get(id).await?;
        let pending = range
            .clone()
            .any(|i| story.pages.get(i).is_some_and(|p| p.is_pending()));
        if !pending || started.elapsed() >= deadline {
            return Ok(story);
        }
        tokio::time::sleep(interval).await;
    }
}
