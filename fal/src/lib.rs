//! Minimal fal.ai image generation client.
//!
//! Calls the synchronous inference endpoint (`https://fal.run/{model}`) and
//! returns the hosted URL of the first generated image. Defaults to the
//! Flux Schnell model, which is fast enough to run inline in a background
//! illustration task.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://fal.run";
const DEFAULT_MODEL: &str = "fal-ai/flux/schnell";

/// Errors that can occur when using the fal client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API credentials not configured")]
    NoCredentials,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response contained no images")]
    NoImages,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// fal.ai API client.
#[derive(Clone)]
pub struct Fal {
    client: reqwest::Client,
    credentials: String,
    model: String,
}

impl Fal {
    /// Create a new fal client with the given credentials.
    pub fn new(credentials: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            credentials: credentials.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a fal client from the FAL_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let credentials = std::env::var("FAL_KEY").map_err(|_| Error::NoCredentials)?;
        Ok(Self::new(credentials))
    }

    /// Set the model endpoint for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Generate an image and return the URL of the first result.
    pub async fn generate(&self, request: ImageRequest) -> Result<ImageResponse, Error> {
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(format!("{API_BASE}/{}", self.model))
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        if api_response.images.is_empty() {
            return Err(Error::NoImages);
        }

        Ok(ImageResponse {
            images: api_response
                .images
                .into_iter()
                .map(|i| Image {
                    url: i.url,
                    width: i.width,
                    height: i.height,
                })
                .collect(),
        })
    }

    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Key {}", self.credentials))
                .map_err(|e| Error::Config(format!("Invalid credentials: {e}")))?,
        );
        Ok(headers)
    }
}

// ============================================================================
// Public types
// ============================================================================

/// An image generation request.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub image_size: ImageSize,
}

impl ImageRequest {
    /// Create a request with the default 800x600 size.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_size: ImageSize {
                width: 800,
                height: 600,
            },
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = ImageSize { width, height };
        self
    }
}

/// Requested output dimensions.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A successful generation result.
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub images: Vec<Image>,
}

impl ImageResponse {
    /// URL of the first generated image, if any. `generate` never returns
    /// an empty response, but the fields are public.
    pub fn url(&self) -> Option<&str> {
        self.images.first().map(|image| image.url.as_str())
    }
}

/// One generated image.
#[derive(Debug, Clone)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse {
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}
