//! Conversation preprocessing: raw transcript → structured per-speaker
//! messages plus participation stats.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One parsed message. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub speaker: String,
    pub text: String,
    /// Position in the parsed message sequence.
    pub index: usize,
    /// Message length in characters.
    pub length: usize,
    pub word_count: usize,
}

/// A parsed conversation with per-speaker stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub total_messages: usize,
    pub speakers: Vec<String>,
    /// Deterministic (sorted) speaker → message count map.
    pub speaker_counts: BTreeMap<String, usize>,
    /// Length of the raw input in characters.
    pub conversation_length: usize,
    /// True iff all speakers have the same message count (vacuously true
    /// for an empty conversation).
    pub is_balanced: bool,
}

/// Split a transcript into speaker-labelled messages.
///
/// A line becomes a message only if it contains a `:` delimiter — speaker
/// is the trimmed prefix before the first `:`, body the trimmed remainder.
/// Empty and delimiterless lines are dropped silently. Empty input yields
/// an empty conversation, never an error.
pub fn parse_conversation(text: &str) -> Conversation {
    let mut messages = Vec::new();
    let mut speaker_counts: BTreeMap<String, usize> = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((speaker, body)) = line.split_once(':') else {
            continue;
        };
        let speaker = speaker.trim().to_string();
        let body = body.trim().to_string();

        *speaker_counts.entry(speaker.clone()).or_insert(0) += 1;
        messages.push(Message {
            index: messages.len(),
            length: body.chars().count(),
            word_count: body.split_whitespace().count(),
            speaker,
            text: body,
        });
    }

    let mut counts: Vec<usize> = speaker_counts.values().copied().collect();
    counts.sort_unstable();
    counts.dedup();
    let is_balanced = counts.len() <= 1;

    Conversation {
        total_messages: messages.len(),
        speakers: speaker_counts.keys().cloned().collect(),
        conversation_length: text.chars().count(),
        is_balanced,
        speaker_counts,
        messages,
    }
}
