//! Near-duplicate filtering over question stems.
//!
//! Items map to a canonical comparison key; first-seen wins. For math, the
//! key also collapses numeric literals and single-letter variable names so
//! that "Solve 2x+3=7" and "Solve 5y+1=11" collide.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::models::domain::question::Section;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(\.\d+)?").expect("NUMBER_RE is a valid regex pattern"));

static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-z]\b").expect("VARIABLE_RE is a valid regex pattern"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE is a valid regex pattern"));

/// Filters `items` to the first occurrence of each key, preserving order.
pub fn dedup_by_key<T, F>(items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Canonical key for reading/writing stems: lowercased, whitespace
/// collapsed.
pub fn stem_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    WHITESPACE_RE
        .replace_all(lowered.trim(), " ")
        .to_string()
}

/// Canonical key for math stems: numeric literals become a placeholder
/// token and single-letter variables a canonical letter, so items differing
/// only by swapped numbers or variable names collide.
pub fn math_stem_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let numbers = NUMBER_RE.replace_all(&lowered, "#");
    let variables = VARIABLE_RE.replace_all(&numbers, "x");
    WHITESPACE_RE
        .replace_all(variables.trim(), " ")
        .to_string()
}

/// Section-appropriate stem key.
pub fn question_key(section: Section, stem: &str) -> String {
    match section {
        Section::Math => math_stem_key(stem),
        Section::Reading | Section::Writing => stem_key(stem),
    }
}
