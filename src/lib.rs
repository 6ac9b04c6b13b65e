//! Clearsignal: hybrid emotional-abuse risk analysis for conversations.
//!
//! Combines a deterministic rule engine (trigger-phrase catalog with
//! severity-weighted scoring) with a second opinion from an external
//! language model, fused into one explainable report. The public entry
//! point is [`pipeline::AnalysisPipeline`].

pub mod config;
pub mod knowledge;
pub mod pipeline;

pub use pipeline::{AnalysisPipeline, AnalysisReport, WorkflowStatus};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration harnesses. Respects
/// `RUST_LOG` when set, otherwise uses the crate default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Clearsignal starting v{}", config::APP_VERSION);
}
