//! Story and page data model.
//!
//! Page order is narrative order: page N presupposes pages 0..N-1. A story
//! always has at least one page, and at most one page carries an unresolved
//! option list — the final one. The store and engine uphold both invariants;
//! this module only defines the shapes and read-side helpers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique story identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(Uuid);

impl StoryId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for StoryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A branching narrative instance with ordered pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: StoryId,
    pub title: String,
    pub child_name: String,
    pub child_age: u8,
    pub child_interest: String,
    pub pages: Vec<Page>,
}

impl Story {
    /// Create a story with a fresh identifier.
    pub fn new(
        title: impl Into<String>,
        child_name: impl Into<String>,
        child_age: u8,
        child_interest: impl Into<String>,
        pages: Vec<Page>,
    ) -> Self {
        Self {
            id: StoryId::new(),
            title: title.into(),
            child_name: child_name.into(),
            child_age,
            child_interest: child_interest.into(),
            pages,
        }
    }

    /// Index of the final page.
    pub fn last_page_index(&self) -> usize {
        self.pages.len().saturating_sub(1)
    }

    /// The tail decision page, if the story is awaiting a choice.
    ///
    /// Returns the page index and its options. Only the final page may
    /// carry options, so no other page is ever considered.
    pub fn awaiting_choice(&self) -> Option<(usize, &[String])> {
        let index = self.last_page_index();
        let options = self.pages.get(index)?.options.as_deref()?;
        if options.is_empty() {
            return None;
        }
        Some((index, options))
    }

    /// Indices of pages whose illustration is still pending.
    pub fn pending_pages(&self) -> Vec<usize> {
        self.pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.is_pending())
            .map(|(i, _)| i)
            .collect()
    }
}

/// One unit of narrative text, optionally carrying reader-facing choices
/// and an illustration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub content: String,

    /// Illustration prompt suggested by the narrative provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,

    /// Dereferenceable illustration location. Absent means pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Reader choices. Present only while this page is the story's
    /// unresolved tail; cleared when a choice is consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

impl Page {
    /// Create a plain narrative page.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Attach an illustration prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// Attach reader choices, making this a branch-decision page.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Whether the illustration for this page has not landed yet.
    pub fn is_pending(&self) -> bool {
        self.image_url.is_none()
    }
}
