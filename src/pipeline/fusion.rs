//! Fusion engine: merges the rule engine's verdict with the AI
//! collaborator's into one report. Total by contract; internal failures
//! degrade to a rule-biased fallback instead of surfacing.

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::detection::{DetectionResult, PatternMatch, RiskLevel, Severity};
use super::insight::AiInsight;

/// Fixed weights for the risk-score blend.
const RULE_SCORE_WEIGHT: f64 = 0.4;
const AI_SCORE_WEIGHT: f64 = 0.6;

/// Caps on the merged lists.
const MAX_PATTERNS: usize = 10;
const MAX_RED_FLAGS: usize = 10;
const MAX_SUGGESTIONS: usize = 8;

/// Confidence assigned to rule-engine findings and to AI patterns that
/// arrive without one.
const RULE_PATTERN_CONFIDENCE: f64 = 0.8;
const AI_PATTERN_DEFAULT_CONFIDENCE: f64 = 0.7;

#[derive(Error, Debug)]
enum FusionError {
    #[error("AI confidence is not a finite number: {0}")]
    NonFiniteConfidence(f64),
}

/// Which side of the analysis produced a merged pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    PatternDetection,
    AiAnalysis,
}

/// One entry in the merged pattern list.
#[derive(Debug, Clone, Serialize)]
pub struct ReportPattern {
    pub name: String,
    pub description: String,
    pub severity: Option<Severity>,
    pub evidence: String,
    pub source: PatternSource,
    pub confidence: f64,
}

/// Sub-scores the fused verdict was built from, kept for explainability.
#[derive(Debug, Clone, Serialize)]
pub struct FusionBreakdown {
    pub pattern_detection_score: u32,
    pub ai_confidence: f64,
    pub pattern_risk_level: RiskLevel,
    pub ai_risk_level: Option<RiskLevel>,
}

/// Terminal output of the fusion stage.
#[derive(Debug, Clone, Serialize)]
pub struct FusedReport {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub patterns: Vec<ReportPattern>,
    pub summary: String,
    pub red_flags: Vec<String>,
    pub suggestions: Vec<String>,
    pub reasoning: String,
    pub confidence: f64,
    pub fusion_breakdown: FusionBreakdown,
}

/// Merge one detection result and one AI insight into a single report.
/// Never fails: computation errors are logged and replaced by a
/// rule-biased fallback report.
pub fn fuse(detection: &DetectionResult, insight: &AiInsight) -> FusedReport {
    match fuse_inner(detection, insight) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Fusion analysis error, using rule-biased fallback");
            fallback_report(detection)
        }
    }
}

fn fuse_inner(
    detection: &DetectionResult,
    insight: &AiInsight,
) -> Result<FusedReport, FusionError> {
    if !insight.confidence.is_finite() {
        return Err(FusionError::NonFiniteConfidence(insight.confidence));
    }
    let ai_confidence = insight.confidence.clamp(0.0, 1.0);

    let rule_score = f64::from(detection.risk_score);
    let risk_level = fuse_risk_level(
        detection.risk_level,
        insight.risk_level,
        rule_score,
        ai_confidence,
    );
    let risk_score = fuse_risk_score(rule_score, ai_confidence, insight.patterns.len());
    let patterns = combine_patterns(detection, insight);
    let red_flags = combine_red_flags(detection, &insight.red_flags);
    let suggestions = build_suggestions(risk_level, &patterns, &insight.suggestions);
    let reasoning = build_reasoning(detection, ai_confidence, risk_level);
    let summary = if insight.summary.is_empty() {
        generate_summary(risk_level, &patterns)
    } else {
        insight.summary.clone()
    };

    Ok(FusedReport {
        risk_level,
        risk_score,
        patterns,
        summary,
        red_flags,
        suggestions,
        reasoning,
        confidence: ai_confidence,
        fusion_breakdown: FusionBreakdown {
            pattern_detection_score: detection.risk_score,
            ai_confidence,
            pattern_risk_level: detection.risk_level,
            ai_risk_level: Some(insight.risk_level),
        },
    })
}

/// Weighted ordinal blend. The rule ordinal is floored upward when the
/// rule score crosses thresholds so a low-confidence AI opinion cannot
/// erase a strong rule signal.
fn fuse_risk_level(
    rule_level: RiskLevel,
    ai_level: RiskLevel,
    rule_score: f64,
    ai_confidence: f64,
) -> RiskLevel {
    let mut rule_value = rule_level.ordinal();
    if rule_score >= 50.0 {
        rule_value = rule_value.max(3.0);
    } else if rule_score >= 25.0 {
        rule_value = rule_value.max(2.0);
    }

    let ai_weight = ai_confidence;
    let rule_weight = 1.0 - ai_weight;
    RiskLevel::from_ordinal(rule_value * rule_weight + ai_level.ordinal() * ai_weight)
}

fn fuse_risk_score(rule_score: f64, ai_confidence: f64, ai_pattern_count: usize) -> f64 {
    let normalized_rule = (rule_score / 100.0).min(1.0);
    let ai_score = ai_confidence * (ai_pattern_count as f64 / 10.0).min(1.0);
    let fused = normalized_rule * RULE_SCORE_WEIGHT + ai_score * AI_SCORE_WEIGHT;
    (fused * 100.0).min(100.0)
}

/// Unify both pattern lists, dedupe by name keeping the higher-confidence
/// entry, sort by severity descending, cap at [`MAX_PATTERNS`].
fn combine_patterns(detection: &DetectionResult, insight: &AiInsight) -> Vec<ReportPattern> {
    let mut combined: Vec<ReportPattern> = Vec::new();

    for m in &detection.patterns {
        combined.push(ReportPattern {
            name: m.category.clone(),
            description: m.description.clone(),
            severity: Some(m.severity),
            evidence: m
                .samples
                .first()
                .cloned()
                .unwrap_or_else(|| "Pattern detected".to_string()),
            source: PatternSource::PatternDetection,
            confidence: RULE_PATTERN_CONFIDENCE,
        });
    }

    for p in &insight.patterns {
        combined.push(ReportPattern {
            name: if p.name.is_empty() {
                "unknown".to_string()
            } else {
                p.name.clone()
            },
            description: p.description.clone(),
            severity: p.severity,
            evidence: p.evidence.clone(),
            source: PatternSource::AiAnalysis,
            confidence: p.confidence.unwrap_or(AI_PATTERN_DEFAULT_CONFIDENCE),
        });
    }

    let mut unique: Vec<ReportPattern> = Vec::new();
    for pattern in combined {
        match unique.iter_mut().find(|u| u.name == pattern.name) {
            Some(existing) => {
                if pattern.confidence > existing.confidence {
                    *existing = pattern;
                }
            }
            None => unique.push(pattern),
        }
    }

    // Unlisted severity ranks below low.
    unique.sort_by(|a, b| {
        let rank = |s: &Option<Severity>| s.map(|s| s.weight()).unwrap_or(0);
        rank(&b.severity).cmp(&rank(&a.severity))
    });
    unique.truncate(MAX_PATTERNS);
    unique
}

fn title_case(category: &str) -> String {
    category
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine_red_flags(detection: &DetectionResult, ai_red_flags: &[String]) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    for m in &detection.patterns {
        if let Some(sample) = m.samples.first() {
            flags.push(format!("{}: {}", title_case(&m.category), sample));
        }
    }
    flags.extend(ai_red_flags.iter().cloned());
    dedup_preserving_order(flags, MAX_RED_FLAGS)
}

fn build_suggestions(
    risk_level: RiskLevel,
    patterns: &[ReportPattern],
    ai_suggestions: &[String],
) -> Vec<String> {
    let base: &[&str] = match risk_level {
        RiskLevel::Safe => &[
            "This conversation appears healthy and respectful",
            "Continue communicating openly and honestly",
            "Remember that healthy relationships involve mutual respect",
        ],
        RiskLevel::Concerning => &[
            "Pay attention to how this conversation makes you feel",
            "Consider discussing your concerns with a trusted friend or counselor",
            "Trust your instincts about the relationship dynamics",
            "Set clear boundaries about what behavior you find acceptable",
        ],
        RiskLevel::Abuse => &[
            "This conversation shows concerning patterns of manipulation or control",
            "Please consider reaching out to a crisis hotline or counselor",
            "Your safety and well-being are important",
            "Consider talking to a trusted friend or family member",
            "Remember that you deserve to be treated with respect and kindness",
        ],
    };
    let mut suggestions: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    let has = |name: &str| patterns.iter().any(|p| p.name == name);
    if has("gaslighting") {
        suggestions
            .push("Consider keeping a record of conversations to verify your memory".to_string());
    }
    if has("threats") {
        suggestions.push(
            "If you feel unsafe, please contact emergency services or a crisis hotline"
                .to_string(),
        );
    }
    if has("isolation_attempts") {
        suggestions.push(
            "Maintain connections with friends and family - isolation is a red flag".to_string(),
        );
    }
    if has("financial_control") {
        suggestions.push("Consider financial independence and separate accounts".to_string());
    }
    if has("sexual_coercion") {
        suggestions.push(
            "Your consent and comfort are important - you have the right to say no".to_string(),
        );
    }

    suggestions.extend(ai_suggestions.iter().cloned());
    dedup_preserving_order(suggestions, MAX_SUGGESTIONS)
}

fn build_reasoning(detection: &DetectionResult, ai_confidence: f64, fused: RiskLevel) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !detection.patterns.is_empty() {
        parts.push(format!(
            "Rule-based detection found {} abuse patterns with a risk score of {}",
            detection.patterns.len(),
            detection.risk_score
        ));
    }
    if ai_confidence > 0.5 {
        parts.push(format!(
            "AI analysis provided contextual reasoning with {:.1}% confidence",
            ai_confidence * 100.0
        ));
    }
    parts.push(format!(
        "Hybrid analysis combining pattern detection with AI reasoning resulted in '{}' risk level",
        fused
    ));
    if detection.risk_score >= 50 {
        parts.push("High pattern score indicates multiple serious abuse indicators".to_string());
    } else if detection.risk_score >= 25 {
        parts.push("Moderate pattern score suggests concerning manipulation tactics".to_string());
    }

    parts.join(". ") + "."
}

fn generate_summary(risk_level: RiskLevel, patterns: &[ReportPattern]) -> String {
    let top_names = || {
        patterns
            .iter()
            .take(3)
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    match risk_level {
        RiskLevel::Safe => {
            "No concerning patterns detected. This appears to be a healthy conversation."
                .to_string()
        }
        RiskLevel::Concerning => format!(
            "Detected concerning patterns including: {}. Please review the relationship \
             dynamics carefully.",
            top_names()
        ),
        RiskLevel::Abuse => format!(
            "Multiple serious abuse patterns detected including: {}. This conversation shows \
             clear signs of emotional abuse and manipulation.",
            top_names()
        ),
    }
}

fn dedup_preserving_order(items: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
            if seen.len() == cap {
                break;
            }
        }
    }
    seen
}

/// Rule-biased report used when fusion itself fails.
fn fallback_report(detection: &DetectionResult) -> FusedReport {
    let patterns = detection
        .patterns
        .iter()
        .map(|m: &PatternMatch| ReportPattern {
            name: m.category.clone(),
            description: m.description.clone(),
            severity: Some(m.severity),
            evidence: m
                .samples
                .first()
                .cloned()
                .unwrap_or_else(|| "Pattern detected".to_string()),
            source: PatternSource::PatternDetection,
            confidence: RULE_PATTERN_CONFIDENCE,
        })
        .collect();

    FusedReport {
        risk_level: detection.risk_level,
        risk_score: f64::from(detection.risk_score),
        patterns,
        summary: "Analysis incomplete due to technical issues. Please review the conversation \
                  carefully."
            .to_string(),
        red_flags: vec!["Technical analysis error - please review manually".to_string()],
        suggestions: vec![
            "Please review the conversation carefully".to_string(),
            "Consider seeking support if you feel unsafe".to_string(),
            "Trust your instincts about the relationship dynamics".to_string(),
        ],
        reasoning: "Fallback analysis due to technical limitations".to_string(),
        confidence: 0.3,
        fusion_breakdown: FusionBreakdown {
            pattern_detection_score: detection.risk_score,
            ai_confidence: 0.0,
            pattern_risk_level: detection.risk_level,
            ai_risk_level: None,
        },
    }
}
