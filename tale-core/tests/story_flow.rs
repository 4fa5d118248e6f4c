//! End-to-end story flow using mock providers.
//!
//! Exercises the full progressive-enrichment cycle: create a story, let
//! background enrichment fill illustrations, continue through a choice,
//! and watch the new pages converge — all through the public API, no
//! network.

use std::sync::Arc;
use std::time::Duration;
use tale_core::provider::ProviderError;
use tale_core::testing::{MockIllustrator, MockNarrative};
use tale_core::{
    sync, ContinuationEngine, EnrichConfig, EnrichmentScheduler, PageSync, StoryStore,
};

fn opening_json() -> String {
    r#"{"title": "Mia and the Lost Egg", "pages": [
        {"content": "Mia found a huge egg.", "imagePrompt": "Mia with a giant egg"},
        {"content": "It began to crack!", "imagePrompt": "cracking egg"},
        {"content": "Out came a baby dinosaur.", "imagePrompt": "baby dinosaur hatching"},
        {"content": "It was hungry and lost.", "imagePrompt": "sad baby dinosaur"},
        {"content": "How could Mia help?", "options": ["Find its family", "Feed it ferns"], "imagePrompt": "Mia thinking"}
    ]}"#
    .to_string()
}

fn continuation_json() -> String {
    r#"{"newPages": [
        {"content": "Mia followed the giant footprints.", "imagePrompt": "Mia tracking footprints"},
        {"content": "They led deep into the fern forest.", "imagePrompt": "fern forest"},
        {"content": "A shadow moved ahead. What should Mia do?", "options": ["Call out", "Hide", "Keep walking"], "imagePrompt": "shadow in forest"}
    ]}"#
    .to_string()
}

#[tokio::test]
async fn test_create_poll_continue_poll() {
    let store = StoryStore::new();
    let engine = ContinuationEngine::new(
        Arc::new(MockNarrative::scripted(vec![
            opening_json(),
            continuation_json(),
        ])),
        store.clone(),
    );
    let illustrator = Arc::new(MockIllustrator::slow(
        "/uploads/art.jpg",
        Duration::from_millis(20),
    ));
    let scheduler = EnrichmentScheduler::new(illustrator.clone(), store.clone());

    // Creation returns immediately, before any enrichment.
    let story = engine.generate_initial("Mia", 6, "dinosaurs").await.unwrap();
    assert_eq!(story.pages.len(), 5);
    assert_eq!(story.pending_pages().len(), 5);

    scheduler.enqueue_range(story.id, 0, 5);

    // Poll until the opening pages are ready.
    let story = sync::await_enrichment(
        &store,
        &story.id,
        0..5,
        Duration::from_millis(10),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(sync::is_fully_enriched(&story));
    assert_eq!(illustrator.calls(), 5);

    // Continue through the first option.
    let updated = engine.continue_story(&story.id, 4, 0).await.unwrap();
    assert_eq!(updated.pages.len(), 8);
    assert!(updated.pages[4].options.is_none());

    // Exactly the new pages are pending; old illustrations are untouched.
    assert_eq!(updated.pending_pages(), vec![5, 6, 7]);
    assert_eq!(updated.pages[0].image_url.as_deref(), Some("/uploads/art.jpg"));

    scheduler.enqueue_range(updated.id, 5, 8);
    let finished = sync::await_enrichment(
        &store,
        &updated.id,
        5..8,
        Duration::from_millis(10),
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert!(sync::is_fully_enriched(&finished));
    assert_eq!(finished.awaiting_choice().unwrap().0, 7);
}

#[tokio::test]
async fn test_fallback_story_still_enriches() {
    let store = StoryStore::new();
    let engine = ContinuationEngine::new(Arc::new(MockNarrative::failing()), store.clone());
    let scheduler = EnrichmentScheduler::new(
        Arc::new(MockIllustrator::ok("/uploads/fallback-art.jpg")),
        store.clone(),
    );

    let story = engine.generate_initial("Mia", 6, "dinosaurs").await.unwrap();
    assert_eq!(story.pages.len(), 5);
    assert_eq!(story.awaiting_choice().unwrap().1.len(), 3);

    scheduler.enqueue_range(story.id, 0, story.pages.len());
    let story = sync::await_enrichment(
        &store,
        &story.id,
        0..5,
        Duration::from_millis(10),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // Fallback narrative and real enrichment compose.
    assert!(sync::is_fully_enriched(&story));
    for page in &story.pages {
        assert!(page.content.contains("Mia"));
    }
}

#[tokio::test]
async fn test_reader_navigation_during_enrichment() {
    let store = StoryStore::new();
    let engine = ContinuationEngine::new(
        Arc::new(MockNarrative::scripted(vec![opening_json()])),
        store.clone(),
    );
    // Only the first two pages get real art before the provider fails.
    let illustrator = Arc::new(MockIllustrator::ok("/uploads/art.jpg").failing_on(3));
    let scheduler = EnrichmentScheduler::new(illustrator, store.clone())
        .with_config(EnrichConfig::default().with_max_concurrent(1));

    let story = engine.generate_initial("Mia", 6, "dinosaurs").await.unwrap();
    scheduler.enqueue_range(story.id, 0, 5);

    let story = sync::await_enrichment(
        &store,
        &story.id,
        0..5,
        Duration::from_millis(10),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    // The failed page is placeholder-ready: navigable, indistinguishable.
    let states = sync::sync_states(&story);
    assert!(states.iter().all(|s| *s == PageSync::Ready));
    assert!(sync::can_navigate_to(&story, 2));
    assert_eq!(
        story.pages[2].image_url.as_deref(),
        Some("/images/placeholder.jpg")
    );
}

#[tokio::test]
async fn test_double_submit_second_continue_rejected() {
    let store = StoryStore::new();
    let engine = ContinuationEngine::new(
        Arc::new(MockNarrative::scripted(vec![
            opening_json(),
            continuation_json(),
        ])),
        store.clone(),
    );

    let story = engine.generate_initial("Mia", 6, "dinosaurs").await.unwrap();
    engine.continue_story(&story.id, 4, 0).await.unwrap();

    // The same (page, option) submitted again must not double-append.
    let err = engine.continue_story(&story.id, 4, 0).await.unwrap_err();
    assert!(matches!(
        err,
        tale_core::EngineError::InvalidTransition(_)
    ));
    assert_eq!(store.get(&story.id).await.unwrap().pages.len(), 8);
}

#[tokio::test]
async fn test_malformed_provider_output_never_panics() {
    let cases = vec![
        "".to_string(),
        "{}".to_string(),
        "]{[".to_string(),
        r#"{"pages": "not an array"}"#.to_string(),
        r#"```json
{"pages": [{"content": ""}]}
```"#
            .to_string(),
    ];
    for case in cases {
        let store = StoryStore::new();
        let engine =
            ContinuationEngine::new(Arc::new(MockNarrative::scripted(vec![case])), store.clone());
        let story = engine.generate_initial("Mia", 6, "dinosaurs").await.unwrap();
        assert_eq!(story.pages.len(), 5, "fallback expected");
    }
}

#[tokio::test]
async fn test_provider_error_display() {
    // Error taxonomy is part of the logging contract.
    assert_eq!(
        ProviderError::Timeout.to_string(),
        "provider timed out"
    );
}
