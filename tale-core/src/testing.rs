//! Testing utilities: deterministic mock providers.
//!
//! These run integration tests without any network calls. `MockNarrative`
//! returns scripted responses in order; `MockIllustrator` returns a canned
//! URL with optional delays and failures to exercise the enrichment paths.

use crate::provider::{IllustrationProvider, NarrativeProvider, ProviderError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A narrative provider that returns scripted responses.
pub struct MockNarrative {
    responses: Mutex<VecDeque<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockNarrative {
    /// Responses returned in order; once exhausted, the provider fails,
    /// which drives callers onto the fallback path.
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that always fails.
    pub fn failing() -> Self {
        Self::scripted(Vec::new())
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of generate calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeProvider for MockNarrative {
    async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .expect("mock responses poisoned")
            .pop_front()
            .ok_or_else(|| ProviderError::Unavailable("no scripted responses left".into()))
    }

    fn name(&self) -> &str {
        "mock-narrative"
    }
}

/// An illustration provider with a canned URL and configurable behavior.
pub struct MockIllustrator {
    url: String,
    delay: Option<Duration>,
    fail_on_call: Option<usize>,
    always_fail: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl MockIllustrator {
    /// Succeeds immediately with the given URL.
    pub fn ok(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            delay: None,
            fail_on_call: None,
            always_fail: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fails every call.
    pub fn failing() -> Self {
        let mut mock = Self::ok("");
        mock.always_fail = true;
        mock
    }

    /// Succeeds after sleeping for `delay` on each call.
    pub fn slow(url: impl Into<String>, delay: Duration) -> Self {
        let mut mock = Self::ok(url);
        mock.delay = Some(delay);
        mock
    }

    /// Never completes; pairs with a scheduler timeout.
    pub fn hanging() -> Self {
        let mut mock = Self::ok("");
        mock.hang = true;
        mock
    }

    /// Fail only the nth call (1-based), succeed otherwise.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of illustrate calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IllustrationProvider for MockIllustrator {
    async fn illustrate(&self, _prompt: &str) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.hang {
            // Effectively forever relative to any test timeout.
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return Err(ProviderError::Timeout);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.always_fail || self.fail_on_call == Some(call) {
            return Err(ProviderError::Unavailable("mock failure".into()));
        }
        Ok(self.url.clone())
    }

    fn name(&self) -> &str {
        "mock-illustrator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockNarrative::scripted(vec!["one".into(), "two".into()]);
        assert_eq!(mock.generate("p").await.unwrap(), "one");
        assert_eq!(mock.generate("p").await.unwrap(), "two");
        assert!(mock.generate("p").await.is_err());
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_illustrator_fail_on_call() {
        let mock = MockIllustrator::ok("/x.jpg").failing_on(2);
        assert!(mock.illustrate("p").await.is_ok());
        assert!(mock.illustrate("p").await.is_err());
        assert!(mock.illustrate("p").await.is_ok());
    }

    #[tokio::test]
    async fn test_illustrator_always_failing() {
        let mock = MockIllustrator::failing();
        assert!(mock.illustrate("p").await.is_err());
        assert!(mock.illustrate("p").await.is_err());
    }
}
