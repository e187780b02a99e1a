use crate::models::ContentSection;
use crate::rich_text;

pub const WORDS_PER_MINUTE: usize = 200;

/// Estimated reading time in whole minutes. Each section is rounded up on its
/// own before summing, so many short sections read longer than one long one.
pub fn estimate(sections: &[ContentSection]) -> usize {
    sections
        .iter()
        .map(|section| word_count(&rich_text::as_text(&section.body)).div_ceil(WORDS_PER_MINUTE))
        .sum()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
