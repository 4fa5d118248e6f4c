//! HTTP API for story creation, fetching, and continuation.
//!
//! The creation and continuation handlers respond as soon as the
//! narrative is stored; illustration enrichment is enqueued for the new
//! page range and runs in the background. Polling clients re-fetch the
//! story until the pages they care about are no longer pending.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tale_core::{sync, EngineError, StoreError, StoryId};
use tracing::{info, instrument};

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/stories", post(create_story))
        .route("/api/stories/:story_id", get(get_story))
        .route("/api/stories/:story_id/continue", post(continue_story))
        .with_state(state)
}

/// Health check endpoint.
#[instrument(skip_all)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStoryRequest {
    #[serde(default)]
    child_name: Option<String>,
    #[serde(default)]
    child_age: Option<u8>,
    #[serde(default)]
    child_interest: Option<String>,
}

/// Create a new story and schedule illustrations for every page.
#[instrument(skip_all)]
async fn create_story(
    State(state): State<AppState>,
    Json(body): Json<CreateStoryRequest>,
) -> Response {
    let (Some(name), Some(age), Some(interest)) =
        (body.child_name, body.child_age, body.child_interest)
    else {
        return missing_fields();
    };

    match state.engine.generate_initial(&name, age, &interest).await {
        Ok(story) => {
            state.scheduler.enqueue_range(story.id, 0, story.pages.len());
            info!(story = %story.id, pages = story.pages.len(), "story created");
            (StatusCode::CREATED, Json(json!({ "storyId": story.id }))).into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// Current snapshot of a story, however many pages are still pending.
#[instrument(skip(state))]
async fn get_story(State(state): State<AppState>, Path(story_id): Path<String>) -> Response {
    // A malformed id is just an id no story has.
    let Ok(story_id) = story_id.parse::<StoryId>() else {
        return story_not_found();
    };
    match sync::fetch(&state.store, &story_id).await {
        Ok(story) => (StatusCode::OK, Json(story)).into_response(),
        Err(StoreError::NotFound) => story_not_found(),
        Err(e) => internal_error(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContinueRequest {
    #[serde(default)]
    current_page: Option<usize>,
    #[serde(default)]
    selected_option: Option<usize>,
}

/// Continue a story from a selected option and schedule illustrations for
/// exactly the appended pages.
#[instrument(skip(state, body))]
async fn continue_story(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
    Json(body): Json<ContinueRequest>,
) -> Response {
    let Ok(story_id) = story_id.parse::<StoryId>() else {
        return story_not_found();
    };
    let (Some(current_page), Some(selected_option)) = (body.current_page, body.selected_option)
    else {
        return missing_fields();
    };

    // Serialize continuations per story so a double-submit cannot append
    // twice; the second caller fails validation once the first commits.
    let lock = state.continuation_lock(story_id).await;
    let _guard = lock.lock().await;

    match state
        .engine
        .continue_story(&story_id, current_page, selected_option)
        .await
    {
        Ok(story) => {
            // New pages start right after the consumed decision page.
            state
                .scheduler
                .enqueue_range(story_id, current_page + 1, story.pages.len());
            info!(
                story = %story_id,
                new_pages = story.pages.len() - current_page - 1,
                "story continued"
            );
            (StatusCode::OK, Json(story)).into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

fn engine_error_response(e: EngineError) -> Response {
    match e {
        EngineError::Validation(msg) | EngineError::InvalidTransition(msg) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
        EngineError::Store(StoreError::NotFound) => story_not_found(),
        EngineError::Store(e) => internal_error(e),
    }
}

fn missing_fields() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "Missing required fields" })),
    )
        .into_response()
}

fn story_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Story not found" })),
    )
        .into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
