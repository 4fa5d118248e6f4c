//! Continuation engine.
//!
//! The synchronous half of the request path: validates the reader's input,
//! asks the narrative provider for a page batch, and commits the result to
//! the store. Provider and parse failures are absorbed here — the engine
//! falls back to deterministic template content, so the only errors that
//! escape are caller-input errors and missing stories.

use crate::extract::{parse_batch, NarrativeBatch};
use crate::fallback::{fallback_continuation, fallback_story};
use crate::provider::SharedNarrative;
use crate::store::{StoreError, StoryStore};
use crate::story::{Page, Story, StoryId};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Page-count conventions used in the provider prompts.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pages requested for an opening story.
    pub initial_pages: usize,

    /// Minimum pages requested for a continuation.
    pub continuation_pages_min: usize,

    /// Maximum pages requested for a continuation.
    pub continuation_pages_max: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_pages: 5,
            continuation_pages_min: 3,
            continuation_pages_max: 4,
        }
    }
}

impl EngineConfig {
    pub fn with_initial_pages(mut self, count: usize) -> Self {
        self.initial_pages = count;
        self
    }
}

/// Grows stories: opening generation and option-driven continuation.
pub struct ContinuationEngine {
    narrative: SharedNarrative,
    store: StoryStore,
    config: EngineConfig,
}

impl ContinuationEngine {
    pub fn new(narrative: SharedNarrative, store: StoryStore) -> Self {
        Self {
            narrative,
            store,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate and store an opening story.
    ///
    /// Returns the stored story synchronously with every illustration
    /// pending; enrichment is scheduled by the caller, not awaited here.
    pub async fn generate_initial(
        &self,
        child_name: &str,
        child_age: u8,
        child_interest: &str,
    ) -> Result<Story, EngineError> {
        if child_name.trim().is_empty() {
            return Err(EngineError::Validation("child name is required".into()));
        }
        if child_interest.trim().is_empty() {
            return Err(EngineError::Validation("child interest is required".into()));
        }

        let prompt = self.build_initial_prompt(child_name, child_age, child_interest);
        let story = match self.request_opening(&prompt).await {
            Some((title, pages)) => Story::new(
                title.unwrap_or_else(|| format!("{child_name}'s Adventure")),
                child_name,
                child_age,
                child_interest,
                pages,
            ),
            None => fallback_story(child_name, child_age, child_interest),
        };

        let id = self.store.create(story).await?;
        Ok(self.store.get(&id).await?)
    }

    /// Continue a story from the selected option on its tail page.
    ///
    /// `current_page` must be the story's last page and must carry options
    /// with `selected_option` in range; otherwise the story is left
    /// unchanged and [`EngineError::InvalidTransition`] is returned.
    pub async fn continue_story(
        &self,
        id: &StoryId,
        current_page: usize,
        selected_option: usize,
    ) -> Result<Story, EngineError> {
        let story = self.store.get(id).await?;

        let (tail_index, options) = story.awaiting_choice().ok_or_else(|| {
            EngineError::InvalidTransition("story is not awaiting a choice".into())
        })?;
        if current_page != tail_index {
            return Err(EngineError::InvalidTransition(format!(
                "page {current_page} is not the current last page ({tail_index})"
            )));
        }
        if selected_option >= options.len() {
            return Err(EngineError::InvalidTransition(format!(
                "option {selected_option} out of range (page has {} options)",
                options.len()
            )));
        }
        let chosen = options[selected_option].clone();

        let prompt = self.build_continuation_prompt(&story, current_page, &chosen);
        let new_pages = match self.request_continuation(&prompt).await {
            Some(pages) => pages,
            None => fallback_continuation(&story.child_name, &story.child_interest, &chosen),
        };

        Ok(self.store.append_pages(id, new_pages).await?)
    }

    /// Call the provider for an opening batch; None means use the fallback.
    async fn request_opening(&self, prompt: &str) -> Option<(Option<String>, Vec<Page>)> {
        let text = match self.narrative.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = self.narrative.name(), error = %e, "narrative provider failed, using fallback story");
                return None;
            }
        };
        debug!(chars = text.len(), "narrative provider returned opening text");

        match parse_batch(&text) {
            Ok(NarrativeBatch::Opening { title, pages }) if ends_with_choice(&pages) => {
                Some((title, pages))
            }
            Ok(_) => {
                warn!("opening batch had wrong shape, using fallback story");
                None
            }
            Err(e) => {
                warn!(error = %e, "unparsable opening output, using fallback story");
                None
            }
        }
    }

    /// Call the provider for a continuation batch; None means fallback.
    async fn request_continuation(&self, prompt: &str) -> Option<Vec<Page>> {
        let text = match self.narrative.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = self.narrative.name(), error = %e, "narrative provider failed, using fallback continuation");
                return None;
            }
        };
        debug!(chars = text.len(), "narrative provider returned continuation text");

        match parse_batch(&text) {
            Ok(NarrativeBatch::Continuation { new_pages }) if ends_with_choice(&new_pages) => {
                Some(new_pages)
            }
            Ok(_) => {
                warn!("continuation batch had wrong shape, using fallback continuation");
                None
            }
            Err(e) => {
                warn!(error = %e, "unparsable continuation output, using fallback continuation");
                None
            }
        }
    }

    fn build_initial_prompt(&self, name: &str, age: u8, interest: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Create the first {} pages of a children's story for a {age}-year-old named {name} who loves {interest}.\n\n",
            self.config.initial_pages
        ));
        prompt.push_str(&format!("The story should:\n\
            - Feature {name} as the main character\n\
            - Put the child in a fun and exciting adventure with a clear theme and plenty of detail\n\
            - Introduce conflicts and problems to solve\n\
            - Keep each page to 3-5 sentences appropriate for the child's age\n\
            - End with 2-3 options for what could happen next (a story direction, or the answer to a puzzle or problem)\n\n"));
        prompt.push_str(
            "Format the response as a JSON object with this structure:\n\
            {\n\
              \"title\": \"Story title\",\n\
              \"pages\": [\n\
                {\"content\": \"Page 1 text...\", \"imagePrompt\": \"detailed illustration prompt for this page\"},\n\
                ...,\n\
                {\"content\": \"Final page text...\", \"options\": [\"option 1\", \"option 2\"], \"imagePrompt\": \"detailed illustration prompt\"}\n\
              ]\n\
            }\n",
        );
        prompt
    }

    fn build_continuation_prompt(&self, story: &Story, current_page: usize, chosen: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "Continue this children's story for a {}-year-old named {} who loves {}.\n\n",
            story.child_age, story.child_name, story.child_interest
        ));
        prompt.push_str(&format!("Current story so far:\nTitle: {}\n\n", story.title));

        for (index, page) in story.pages.iter().take(current_page + 1).enumerate() {
            prompt.push_str(&format!("Page {}: {}\n\n", index + 1, page.content));
        }

        prompt.push_str(&format!(
            "The reader selected this option for what happens next:\n\"{chosen}\"\n\n"
        ));
        prompt.push_str(&format!(
            "Generate {}-{} new pages that continue the story based on this choice. \
             The final new page should present 2-3 new options for what could happen next, \
             or how to solve any problem or puzzle the characters encounter.\n\n",
            self.config.continuation_pages_min, self.config.continuation_pages_max
        ));
        prompt.push_str(
            "Format the response as a JSON object with this structure:\n\
            {\n\
              \"newPages\": [\n\
                {\"content\": \"New page text...\", \"imagePrompt\": \"illustration prompt\"},\n\
                ...,\n\
                {\"content\": \"Final new page text...\", \"options\": [\"option 1\", \"option 2\", \"option 3\"], \"imagePrompt\": \"illustration prompt\"}\n\
              ]\n\
            }\n",
        );
        prompt
    }
}

/// Whether the batch upholds the branching contract: a final page with a
/// non-empty option list.
fn ends_with_choice(pages: &[Page]) -> bool {
    pages
        .last()
        .and_then(|p| p.options.as_ref())
        .is_some_and(|o| !o.is_empty())
}
