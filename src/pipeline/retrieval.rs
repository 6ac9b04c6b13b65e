//! Keyword-overlap retrieval of pattern definitions.
//!
//! Feeds collaborator context only — the rule engine never consults the
//! knowledge base. An empty knowledge base degrades to an empty
//! retrieval set, never an error.

use serde::{Deserialize, Serialize};

use crate::knowledge::PatternDefinition;

/// Words too common to carry retrieval signal.
static STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "must", "can", "i", "you", "he",
    "she", "it", "we", "they", "me", "him", "her", "us", "them",
];

/// Definitions relevant to one conversation, plus the keywords that were
/// considered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub definitions: Vec<PatternDefinition>,
    pub keywords: Vec<String>,
}

/// Extract retrieval keywords: tokens longer than 3 characters,
/// punctuation-trimmed, case-folded, stop-words removed, deduplicated.
/// Sorted for deterministic output.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .map(|w| w.trim_matches(|c: char| ".,!?;:".contains(c)).to_string())
        .filter(|w| w.len() > 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect();
    keywords.sort_unstable();
    keywords.dedup();
    keywords
}

/// Select definitions whose any keyword appears in the lowercased
/// conversation text.
pub fn retrieve(definitions: &[PatternDefinition], conversation_text: &str) -> RetrievedContext {
    let text_lower = conversation_text.to_lowercase();

    let matched: Vec<PatternDefinition> = definitions
        .iter()
        .filter(|def| {
            def.keywords
                .iter()
                .any(|kw| text_lower.contains(&kw.to_lowercase()))
        })
        .cloned()
        .collect();

    RetrievedContext {
        definitions: matched,
        keywords: extract_keywords(&text_lower),
    }
}
