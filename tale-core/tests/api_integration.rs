//! Integration tests that call the real provider APIs.
//!
//! These tests require ANTHROPIC_API_KEY (and FAL_KEY for illustration
//! tests) to be set, via .env file or environment.
//! Run with: `cargo test -p tale-core --test api_integration -- --ignored`
//!
//! Marked #[ignore] by default to avoid API costs in CI, failures when no
//! key is available, and slow test runs.

use std::sync::Arc;
use tale_core::provider::ClaudeNarrative;
use tale_core::{ContinuationEngine, StoryStore};

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

fn has_api_key() -> bool {
    std::env::var("ANTHROPIC_API_KEY").is_ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -p tale-core --test api_integration -- --ignored
async fn test_live_opening_story_has_branching_tail() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let store = StoryStore::new();
    let narrative = ClaudeNarrative::from_env().expect("Failed to create narrative provider");
    let engine = ContinuationEngine::new(Arc::new(narrative), store.clone());

    let story = engine
        .generate_initial("Mia", 6, "dinosaurs")
        .await
        .expect("generation failed");

    assert!(!story.pages.is_empty());
    let (index, options) = story.awaiting_choice().expect("no closing options");
    assert_eq!(index, story.pages.len() - 1);
    assert!((2..=3).contains(&options.len()), "options: {options:?}");
    for (i, page) in story.pages.iter().enumerate().take(index) {
        assert!(page.options.is_none(), "page {i} has premature options");
    }
}

#[tokio::test]
#[ignore] // Run with: cargo test -p tale-core --test api_integration -- --ignored
async fn test_live_continuation_grows_story() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: ANTHROPIC_API_KEY not set");
        return;
    }

    let store = StoryStore::new();
    let narrative = ClaudeNarrative::from_env().expect("Failed to create narrative provider");
    let engine = ContinuationEngine::new(Arc::new(narrative), store.clone());

    let story = engine
        .generate_initial("Leo", 8, "rockets")
        .await
        .expect("generation failed");
    let before = story.pages.len();
    let (tail, _) = story.awaiting_choice().expect("no closing options");

    let updated = engine
        .continue_story(&story.id, tail, 0)
        .await
        .expect("continuation failed");

    assert!(updated.pages.len() > before);
    assert!(updated.pages[tail].options.is_none());
    assert!(updated.awaiting_choice().is_some());
}
