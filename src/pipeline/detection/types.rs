use serde::{Deserialize, Serialize};

/// Severity tier of a pattern category. Ordering is ascending
/// (`Low < Medium < High < Critical`) so tiers can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Contribution weight per occurrence.
    pub fn weight(self) -> u32 {
        match self {
            Self::Critical => 10,
            Self::High => 7,
            Self::Medium => 4,
            Self::Low => 2,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Discrete risk classification for a conversation.
///
/// Ordering is ascending (`Safe < Concerning < Abuse`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Safe,
    Concerning,
    Abuse,
}

impl RiskLevel {
    /// Ordinal used by the fusion weighting (safe=1, concerning=2, abuse=3).
    pub fn ordinal(self) -> f64 {
        match self {
            Self::Safe => 1.0,
            Self::Concerning => 2.0,
            Self::Abuse => 3.0,
        }
    }

    /// Map a fused ordinal back to a level (≥2.5 abuse, ≥1.5 concerning).
    pub fn from_ordinal(value: f64) -> Self {
        if value >= 2.5 {
            Self::Abuse
        } else if value >= 1.5 {
            Self::Concerning
        } else {
            Self::Safe
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Concerning => write!(f, "concerning"),
            Self::Abuse => write!(f, "abuse"),
        }
    }
}

/// One matched pattern category with its evidence and contribution score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Category identifier, e.g. "gaslighting".
    pub category: String,
    /// What this category means, from the rule catalog.
    pub description: String,
    /// Fixed severity tier of the category.
    pub severity: Severity,
    /// Up to 3 sampled trigger matches.
    pub samples: Vec<String>,
    /// Total trigger occurrences across the whole text.
    pub count: usize,
    /// `count × severity weight`.
    pub score: u32,
}

/// Boolean context indicators checked independently of category scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextIndicators {
    pub escalation: bool,
    pub victim_blaming: bool,
    pub power_imbalance: bool,
}

/// Per-speaker participation figures for the dynamics side channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerDynamics {
    pub speaker: String,
    pub messages: usize,
    /// Average message length in characters.
    pub avg_length: f64,
    /// Share of total messages, in percent.
    pub share: f64,
}

/// Conversation balance analysis. Informational only — never feeds the
/// risk ladder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dynamics {
    pub speakers: Vec<SpeakerDynamics>,
    pub total_messages: usize,
    /// True when the share gap between speakers exceeds 30 points.
    pub is_one_sided: bool,
}

/// Full output of the rule-based detection engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// One entry per category with at least one trigger hit.
    pub patterns: Vec<PatternMatch>,
    /// Sum of occurrence counts across all categories.
    pub total_occurrences: usize,
    /// Sum of per-category contribution scores.
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub indicators: ContextIndicators,
    pub dynamics: Dynamics,
}
