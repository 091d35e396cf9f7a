//! Word filters applied to provider output
//!
//! Providers are free to return junk; everything that reaches a word pool or
//! a question goes through one of these checks first.

use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Allowed length (in characters) of a source word
pub const SOURCE_WORD_LENGTH: RangeInclusive<usize> = 3..=10;

/// Uppercase the first character and lowercase the rest
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Case-insensitive equality
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Whether a raw word is usable as a source word
pub fn is_valid_source_word(word: &str) -> bool {
    let len = word.chars().count();
    SOURCE_WORD_LENGTH.contains(&len) && word.chars().all(char::is_alphabetic)
}

/// Filter, deduplicate, capitalize and shuffle raw source words
pub fn normalize_source_words(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut words: Vec<String> = raw
        .iter()
        .map(|w| w.trim())
        .filter(|w| is_valid_source_word(w))
        .filter(|w| seen.insert(w.to_lowercase()))
        .map(capitalize)
        .collect();
    words.shuffle(&mut rand::thread_rng());
    words
}

/// Accept a secondary-language translation for the word pool
///
/// A translation is kept when it has at most two whitespace-separated tokens,
/// is at least two characters long, contains no digits, and has at least one
/// letter from a-z or `extra_letters`. Returns the capitalized form.
pub fn accept_secondary_translation(translation: &str, extra_letters: &str) -> Option<String> {
    let text = translation.trim();
    if text.split_whitespace().count() > 2 || text.chars().count() < 2 {
        return None;
    }
    if text.chars().any(char::is_numeric) {
        return None;
    }
    let has_letter = text
        .chars()
        .flat_map(char::to_lowercase)
        .any(|c| c.is_ascii_lowercase() || extra_letters.contains(c));
    has_letter.then(|| capitalize(text))
}

/// Pick up to `count` distractor source words from a random fetch, in fetch order
///
/// Skips words reserved by the pools, duplicates, non-alphabetic entries and
/// the question's own source word (all compared case-insensitively). The
/// result may be shorter than `count`; the caller pads it.
pub fn pick_distractor_sources(
    fetched: &[String],
    reserved: &HashSet<String>,
    source_word: &str,
    count: usize,
) -> Vec<String> {
    let source = source_word.to_lowercase();
    let mut chosen: Vec<String> = Vec::with_capacity(count);
    for word in fetched.iter().map(|w| w.trim()) {
        if chosen.len() >= count {
            break;
        }
        let lower = word.to_lowercase();
        if word.is_empty()
            || !word.chars().all(char::is_alphabetic)
            || reserved.contains(&lower)
            || lower == source
            || chosen.iter().any(|c| c.to_lowercase() == lower)
        {
            continue;
        }
        chosen.push(capitalize(word));
    }
    chosen
}
