//! Affiliation heuristics.
//!
//! An affiliation is treated as academic when it mentions one of a fixed set of
//! institutional keywords. Matching is plain substring matching on the
//! lowercased text, so any organization whose name happens to contain a keyword
//! is counted as academic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords that mark an affiliation as academic
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "university",
    "institute",
    "college",
    "school",
    "department",
    "faculty",
    "hospital",
    "centre",
    "center",
];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

/// Returns true when the affiliation looks academic.
///
/// An empty affiliation is non-academic: missing data never counts as academic.
pub fn is_academic_affiliation(affiliation: &str) -> bool {
    let affil = affiliation.to_lowercase();
    ACADEMIC_KEYWORDS.iter().any(|kw| affil.contains(kw))
}

/// Extract the first email address found in `text`, scanning left to right.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}
