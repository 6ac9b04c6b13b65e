use serde::{Deserialize, Serialize};

use crate::knowledge::PatternDefinition;
use crate::pipeline::detection::{RiskLevel, Severity};

/// Context handed to the collaborator alongside the conversation:
/// retrieved pattern definitions plus what the rule engine already found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InsightContext {
    pub rag_patterns: Vec<PatternDefinition>,
    pub detected_patterns: Vec<DetectedPatternRef>,
}

/// Minimal reference to a rule-engine finding, for prompt enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedPatternRef {
    pub category: String,
    pub description: String,
}

/// One pattern reported by the collaborator. Untrusted input — every
/// field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiPattern {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Structured collaborator verdict. Untrusted and possibly partial:
/// every field defaults (risk level to safe, confidence to 0.0).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiInsight {
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub patterns: Vec<AiPattern>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
}

impl AiInsight {
    /// The documented fail-closed verdict used whenever the collaborator
    /// is unavailable or returns garbage.
    pub fn fallback() -> Self {
        Self {
            risk_level: RiskLevel::Concerning,
            patterns: vec![],
            summary: "Unable to complete full AI analysis. Please review the conversation \
                      carefully and trust your instincts."
                .to_string(),
            red_flags: vec!["AI analysis unavailable - please use pattern detection results"
                .to_string()],
            suggestions: vec![
                "Please review the conversation carefully".to_string(),
                "Consider seeking support if you feel unsafe".to_string(),
                "Trust your instincts about the relationship dynamics".to_string(),
            ],
            reasoning: "Fallback analysis due to technical limitations".to_string(),
            confidence: 0.3,
        }
    }

    /// Clamp the confidence into [0, 1]; non-finite values collapse to 0.
    pub fn sanitize(mut self) -> Self {
        if !self.confidence.is_finite() {
            self.confidence = 0.0;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
        for pattern in &mut self.patterns {
            if let Some(c) = pattern.confidence {
                pattern.confidence = if c.is_finite() {
                    Some(c.clamp(0.0, 1.0))
                } else {
                    None
                };
            }
        }
        self
    }
}
