//! AI insight collaborator: a narrow seam over an external LLM endpoint.
//!
//! The rest of the pipeline only sees [`InsightProvider`], which never
//! fails. The concrete [`NimClient`] maps every transport or parsing
//! problem to the fixed fallback verdict internally.

pub mod client;
pub mod prompt;
pub mod types;

pub use client::NimClient;
pub use types::{AiInsight, AiPattern, DetectedPatternRef, InsightContext};

use thiserror::Error;

/// Errors inside the collaborator boundary. They never cross it:
/// [`InsightProvider::analyze`] converts them to the fallback verdict.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("No API key configured for hosted endpoint (set CLEARSIGNAL_LLM_API_KEY)")]
    MissingApiKey,

    #[error("Cannot connect to LLM endpoint at {0}")]
    Connection(String),

    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("LLM endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    ResponseParsing(String),
}

/// Source of second-opinion analysis for a conversation.
///
/// Infallible by contract: implementations degrade to
/// [`AiInsight::fallback`] rather than surface errors.
pub trait InsightProvider: Send + Sync {
    fn analyze(&self, conversation: &str, context: &InsightContext) -> AiInsight;
}
