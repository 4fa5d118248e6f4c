//! External generation collaborators.
//!
//! The engine and scheduler talk to the outside world through these two
//! traits. The live implementations wrap the `claude` and `fal` clients;
//! [`crate::testing`] provides deterministic mocks.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors from a generation provider.
///
/// These never escape the engine or scheduler: narrative failures resolve
/// into fallback content, illustration failures into the placeholder.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("provider timed out")]
    Timeout,
}

/// Produces narrative text expected to embed a JSON page batch.
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Generate free text from the given prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Produces a dereferenceable image location for a page.
#[async_trait]
pub trait IllustrationProvider: Send + Sync {
    /// Generate an illustration and return its URL.
    async fn illustrate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Shared handle to a narrative provider.
pub type SharedNarrative = Arc<dyn NarrativeProvider>;

/// Shared handle to an illustration provider.
pub type SharedIllustrator = Arc<dyn IllustrationProvider>;

/// Narrative provider backed by the Claude Messages API.
pub struct ClaudeNarrative {
    client: claude::Claude,
    max_tokens: usize,
    temperature: f32,
}

impl ClaudeNarrative {
    pub fn new(client: claude::Claude) -> Self {
        Self {
            client,
            max_tokens: 4000,
            temperature: 0.7,
        }
    }

    /// Build from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, claude::Error> {
        Ok(Self::new(claude::Claude::from_env()?))
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl NarrativeProvider for ClaudeNarrative {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = claude::Request::new(vec![claude::Message::user(prompt)])
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature);

        let response = self
            .client
            .complete(request)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(response.text())
    }

    fn name(&self) -> &str {
        "claude"
    }
}

/// Illustration provider backed by fal.ai Flux Schnell.
pub struct FluxIllustrator {
    client: fal::Fal,
}

impl FluxIllustrator {
    pub fn new(client: fal::Fal) -> Self {
        Self { client }
    }

    /// Build from the FAL_KEY environment variable.
    pub fn from_env() -> Result<Self, fal::Error> {
        Ok(Self::new(fal::Fal::from_env()?))
    }
}

#[async_trait]
impl IllustrationProvider for FluxIllustrator {
    async fn illustrate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = fal::ImageRequest::new(prompt);
        let response = self
            .client
            .generate(request)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        response
            .url()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Unavailable("response contained no images".into()))
    }

    fn name(&self) -> &str {
        "flux-schnell"
    }
}

/// Build a child-friendly illustration prompt from page text.
///
/// The scene description is capped at 200 characters so a long page does
/// not crowd out the style instructions.
pub fn illustration_prompt(scene: &str) -> String {
    let scene: String = scene.chars().take(200).collect();
    format!(
        "Create a child-friendly cartoon illustration for a children's story.\n\
         The scene is: {scene}\n\
         Style: Colorful, whimsical cartoon style suitable for children's books."
    )
}
