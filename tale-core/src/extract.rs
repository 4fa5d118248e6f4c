//! Defensive parsing of narrative provider output.
//!
//! Providers return free text that is expected, but not guaranteed, to
//! embed one JSON object: either a full opening story (`pages`) or a
//! continuation batch (`newPages`). This module pulls the first
//! well-formed object out of the text — preferring a fenced ```json block,
//! falling back to the first balanced-brace fragment — and validates it
//! into a tagged [`NarrativeBatch`]. Any violation maps to
//! [`ProviderError::MalformedOutput`], which callers treat exactly like a
//! provider failure.

use crate::provider::ProviderError;
use crate::story::Page;
use serde::Deserialize;

/// A validated batch of pages from the narrative provider.
#[derive(Debug, Clone)]
pub enum NarrativeBatch {
    /// Full opening story shape.
    Opening {
        title: Option<String>,
        pages: Vec<Page>,
    },
    /// Continuation shape appended to an existing story.
    Continuation { new_pages: Vec<Page> },
}

impl NarrativeBatch {
    /// The pages carried by either variant.
    pub fn pages(&self) -> &[Page] {
        match self {
            NarrativeBatch::Opening { pages, .. } => pages,
            NarrativeBatch::Continuation { new_pages } => new_pages,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBatch {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    pages: Vec<RawPage>,
    #[serde(default)]
    new_pages: Vec<RawPage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPage {
    content: String,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    image_prompt: Option<String>,
}

/// Extract and validate the first JSON page batch embedded in `text`.
pub fn parse_batch(text: &str) -> Result<NarrativeBatch, ProviderError> {
    let json = extract_json(text)
        .ok_or_else(|| ProviderError::MalformedOutput("no JSON object in output".into()))?;

    let raw: RawBatch = serde_json::from_str(json)
        .map_err(|e| ProviderError::MalformedOutput(format!("invalid JSON: {e}")))?;

    if !raw.new_pages.is_empty() {
        Ok(NarrativeBatch::Continuation {
            new_pages: validate_pages(raw.new_pages)?,
        })
    } else if !raw.pages.is_empty() {
        Ok(NarrativeBatch::Opening {
            title: raw.title,
            pages: validate_pages(raw.pages)?,
        })
    } else {
        Err(ProviderError::MalformedOutput(
            "batch contained no pages".into(),
        ))
    }
}

/// Convert raw pages, rejecting empty content and non-final options.
fn validate_pages(raw: Vec<RawPage>) -> Result<Vec<Page>, ProviderError> {
    let last = raw.len() - 1;
    raw.into_iter()
        .enumerate()
        .map(|(index, page)| {
            if page.content.trim().is_empty() {
                return Err(ProviderError::MalformedOutput(format!(
                    "page {index} has empty content"
                )));
            }
            let has_options = page.options.as_ref().is_some_and(|o| !o.is_empty());
            if has_options && index != last {
                return Err(ProviderError::MalformedOutput(format!(
                    "page {index} carries options but is not the final page"
                )));
            }
            Ok(Page {
                content: page.content,
                image_prompt: page.image_prompt,
                image_url: None,
                options: if has_options { page.options } else { None },
            })
        })
        .collect()
}

/// Find the first well-formed JSON object in free text.
///
/// Prefers a ```json fenced block; otherwise scans from the first `{` for
/// a balanced fragment, tracking string literals and escapes so braces
/// inside page text do not confuse the count.
fn extract_json(text: &str) -> Option<&str> {
    if let Some(fenced) = extract_fenced(text) {
        return Some(fenced);
    }
    extract_balanced(text)
}

fn extract_fenced(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let inner = rest[..end].trim();
    if inner.starts_with('{') {
        Some(inner)
    } else {
        None
    }
}

fn extract_balanced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
