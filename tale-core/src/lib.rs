//! Branching illustrated story engine.
//!
//! This crate provides:
//! - A story/page data model with reader-facing choices
//! - An in-memory story store with atomic append and patch operations
//! - A continuation engine that grows stories through an LLM provider,
//!   with a deterministic fallback when the provider fails
//! - A background enrichment scheduler that attaches illustrations to
//!   published pages without blocking the reader
//! - The polling synchronization contract clients use to observe
//!   partially enriched stories
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tale_core::{ContinuationEngine, EnrichmentScheduler, StoryStore};
//! use tale_core::provider::{ClaudeNarrative, FluxIllustrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = StoryStore::new();
//!     let engine = ContinuationEngine::new(
//!         Arc::new(ClaudeNarrative::from_env()?),
//!         store.clone(),
//!     );
//!     let scheduler = EnrichmentScheduler::new(
//!         Arc::new(FluxIllustrator::from_env()?),
//!         store.clone(),
//!     );
//!
//!     let story = engine.generate_initial("Mia", 6, "dinosaurs").await?;
//!     scheduler.enqueue_range(story.id, 0, story.pages.len());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod enrich;
pub mod extract;
pub mod fallback;
pub mod provider;
pub mod store;
pub mod story;
pub mod sync;
pub mod testing;

// Primary public API
pub use engine::{ContinuationEngine, EngineConfig, EngineError};
pub use enrich::{EnrichConfig, EnrichmentScheduler};
pub use store::{StoreError, StoryStore};
pub use story::{Page, Story, StoryId};
pub use sync::PageSync;
