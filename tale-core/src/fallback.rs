//! Deterministic fallback content.
//!
//! When the narrative provider is unavailable or returns unusable output,
//! the engine substitutes these templates so the branching contract always
//! holds: the reader gets a complete story whose final page carries
//! choices, and no request ever fails because a model did. The templates
//! are deliberately deterministic — same protagonist in, same story out.

use crate::story::{Page, Story};

/// A complete 5-page opening story seeded with the protagonist fields.
///
/// Every page mentions the protagonist by name and interest, and the final
/// page carries exactly three options. Never fails.
pub fn fallback_story(name: &str, age: u8, interest: &str) -> Story {
    let pages = vec![
        Page::new(format!(
            "Once upon a time, there was a {age}-year-old named {name} who loved {interest} more than anything in the world."
        ))
        .with_prompt(format!("A child named {name} surrounded by {interest}, smiling with excitement")),
        Page::new(format!(
            "One day, {name} discovered a magical world where {interest} came to life!"
        ))
        .with_prompt(format!("{name} stepping into a glowing magical land full of {interest}")),
        Page::new(format!(
            "{name} had to solve a big problem using everything they knew about {interest}."
        ))
        .with_prompt(format!("{name} thinking hard about a tricky {interest} puzzle")),
        Page::new(format!(
            "With creativity and courage, {name} found the perfect answer hidden among the {interest}!"
        ))
        .with_prompt(format!("{name} celebrating a clever discovery beside the {interest}")),
        Page::new(format!(
            "{name} learned that with imagination and a love of {interest}, any challenge can be overcome."
        ))
        .with_options(vec![
            format!("{name} decides to share the discovery with friends"),
            format!("{name} explores more of the magical world of {interest}"),
            format!("{name} uses the new knowledge to help others"),
        ])
        .with_prompt(format!("{name} looking proud and happy among the {interest}")),
    ];

    Story::new(
        format!("{name}'s Adventure with {interest}"),
        name,
        age,
        interest,
        pages,
    )
}

/// A 3-page fallback continuation, the last page carrying three generic
/// options so the branch never dead-ends.
pub fn fallback_continuation(name: &str, interest: &str, chosen_option: &str) -> Vec<Page> {
    vec![
        Page::new(format!(
            "{name} decided to {}. It was an exciting new chapter in the adventure!",
            chosen_option.to_lowercase()
        ))
        .with_prompt(format!("{name} setting off on a new adventure")),
        Page::new(format!(
            "As {name} continued exploring, they discovered even more amazing things about {interest}."
        ))
        .with_prompt(format!("{name} discovering something new about {interest}")),
        Page::new(format!(
            "The journey wasn't over yet. {name} had more choices to make and adventures to have!"
        ))
        .with_options(vec![
            format!("{name} decides to go home and tell everyone about the adventure"),
            format!("{name} finds a mysterious map leading to a new place"),
            format!("{name} meets a new friend who needs help"),
        ])
        .with_prompt(format!("{name} looking at different paths ahead")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_story_shape() {
        let story = fallback_story("Mia", 6, "dinosaurs");
        assert_eq!(story.pages.len(), 5);

        let (index, options) = story.awaiting_choice().unwrap();
        assert_eq!(index, 4);
        assert_eq!(options.len(), 3);

        for page in &story.pages[..4] {
            assert!(page.options.is_none());
        }
    }

    #[test]
    fn test_fallback_story_mentions_protagonist_everywhere() {
        let story = fallback_story("Mia", 6, "dinosaurs");
        for page in &story.pages {
            assert!(page.content.contains("Mia"), "content: {}", page.content);
            assert!(page.content.contains("dinosaurs"), "content: {}", page.content);
            let prompt = page.image_prompt.as_ref().unwrap();
            assert!(prompt.contains("Mia"), "prompt: {prompt}");
            assert!(prompt.contains("dinosaurs"), "prompt: {prompt}");
        }
    }

    #[test]
    fn test_fallback_story_all_pages_pending() {
        let story = fallback_story("Mia", 6, "dinosaurs");
        assert_eq!(story.pending_pages().len(), 5);
    }

    #[test]
    fn test_fallback_story_is_deterministic() {
        let a = fallback_story("Leo", 8, "rockets");
        let b = fallback_story("Leo", 8, "rockets");
        for (x, y) in a.pages.iter().zip(&b.pages) {
            assert_eq!(x.content, y.content);
        }
        assert_eq!(a.title, b.title);
    }

    #[test]
    fn test_fallback_continuation_shape() {
        let pages = fallback_continuation("Mia", "dinosaurs", "Mia explores the cave");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].options.as_ref().unwrap().len(), 3);
        assert!(pages[0].options.is_none());
        assert!(pages[1].options.is_none());
    }

    #[test]
    fn test_fallback_continuation_references_choice() {
        let pages = fallback_continuation("Mia", "dinosaurs", "Follow the River");
        assert!(pages[0].content.contains("follow the river"));
    }
}
