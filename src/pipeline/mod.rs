//! Conversation analysis pipeline.
//!
//! Six sequential stages: preprocessing, knowledge retrieval, rule-based
//! pattern detection, AI insight, fusion, report generation. The
//! orchestrator ties them together and always returns a well-formed
//! report.

pub mod detection;
pub mod fusion;
pub mod insight;
pub mod orchestrator;
pub mod preprocess;
pub mod retrieval;

pub use orchestrator::{AnalysisPipeline, AnalysisReport, WorkflowStatus};
