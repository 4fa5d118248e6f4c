//! Story server binary.
//!
//! Wires the continuation engine and enrichment scheduler to the HTTP
//! surface. Providers are built from environment variables; when a key is
//! missing the server still runs and every request resolves through the
//! deterministic fallback content, which keeps local development working
//! without credentials.
//!
//! Configuration (environment):
//! - `PORT` — bind port (default 5000)
//! - `ANTHROPIC_API_KEY` — narrative provider key
//! - `FAL_KEY` — illustration provider credentials
//! - `ENRICH_TIMEOUT_SECS` — per-illustration timeout (default 30)
//! - `ENRICH_CONCURRENCY` — concurrent illustration tasks (default 4)

mod api;
mod state;

use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tale_core::provider::{
    ClaudeNarrative, FluxIllustrator, SharedIllustrator, SharedNarrative,
};
use tale_core::{ContinuationEngine, EnrichConfig, EnrichmentScheduler, StoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let narrative: SharedNarrative = match ClaudeNarrative::from_env() {
        Ok(provider) => Arc::new(provider),
        Err(_) => {
            warn!("ANTHROPIC_API_KEY not set; stories will use fallback content");
            Arc::new(ClaudeNarrative::new(claude::Claude::new("")))
        }
    };
    let illustrator: SharedIllustrator = match FluxIllustrator::from_env() {
        Ok(provider) => Arc::new(provider),
        Err(_) => {
            warn!("FAL_KEY not set; illustrations will use the placeholder");
            Arc::new(FluxIllustrator::new(fal::Fal::new("")))
        }
    };

    let store = StoryStore::new();
    let engine = Arc::new(ContinuationEngine::new(narrative, store.clone()));
    let scheduler = EnrichmentScheduler::new(illustrator, store.clone()).with_config(
        EnrichConfig::default()
            .with_timeout(Duration::from_secs(env_or("ENRICH_TIMEOUT_SECS", 30)))
            .with_max_concurrent(env_or("ENRICH_CONCURRENCY", 4usize)),
    );

    let app = api::create_router(AppState::new(store, engine, scheduler));

    let port: u16 = env_or("PORT", 5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "story server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Read a numeric environment variable, falling back on absence or parse
/// failure. Out-of-range values fail the parse and take the default.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
