pub mod catalog;
pub mod engine;
pub mod types;

pub use engine::{analyze_dynamics, detect};
pub use types::{
    ContextIndicators, DetectionResult, Dynamics, PatternMatch, RiskLevel, Severity,
    SpeakerDynamics,
};
