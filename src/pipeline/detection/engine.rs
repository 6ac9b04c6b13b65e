//! Deterministic rule-based scan of a conversation transcript.
//!
//! Pure function over text: the only failure mode is a malformed catalog
//! entry, which is fatal at first use, never at request time.

use super::catalog::{
    CATALOG, ESCALATION_PHRASES, POWER_IMBALANCE_PHRASES, VICTIM_BLAMING_PHRASES,
};
use super::types::{
    ContextIndicators, DetectionResult, Dynamics, PatternMatch, RiskLevel, SpeakerDynamics,
};
use crate::pipeline::preprocess::parse_conversation;

/// Categories whose combined occurrence count feeds the final ladder rule.
const KEY_CATEGORIES: &[&str] = &["threats", "gaslighting", "intimidation", "sexual_coercion"];

/// Share gap (percentage points) beyond which a conversation counts as
/// one-sided.
const ONE_SIDED_GAP: f64 = 30.0;

/// Scan the whole conversation text against the static rule catalog.
///
/// Matching is whole-text (cross-message) on the lowercased transcript;
/// per-message attribution is intentionally not performed.
pub fn detect(conversation_text: &str) -> DetectionResult {
    let text_lower = conversation_text.to_lowercase();

    let mut patterns = Vec::new();
    for rule in CATALOG.iter() {
        let mut samples = Vec::new();
        let mut count = 0usize;
        for mat in rule.regex.find_iter(&text_lower) {
            if samples.len() < 3 {
                samples.push(mat.as_str().to_string());
            }
            count += 1;
        }
        if count > 0 {
            patterns.push(PatternMatch {
                category: rule.category.to_string(),
                description: rule.description.to_string(),
                severity: rule.severity,
                samples,
                count,
                score: count as u32 * rule.severity.weight(),
            });
        }
    }

    let indicators = check_indicators(&text_lower);
    let total_occurrences = patterns.iter().map(|p| p.count).sum();
    let risk_score = patterns.iter().map(|p| p.score).sum();
    let risk_level = classify_risk(risk_score, &patterns, indicators);
    let dynamics = analyze_dynamics(conversation_text);

    DetectionResult {
        patterns,
        total_occurrences,
        risk_score,
        risk_level,
        indicators,
        dynamics,
    }
}

fn check_indicators(text_lower: &str) -> ContextIndicators {
    let hit = |phrases: &[&str]| phrases.iter().any(|p| text_lower.contains(p));
    ContextIndicators {
        escalation: hit(ESCALATION_PHRASES),
        victim_blaming: hit(VICTIM_BLAMING_PHRASES),
        power_imbalance: hit(POWER_IMBALANCE_PHRASES),
    }
}

/// Ordered decision ladder. First matching rule wins; later rules never
/// downgrade an earlier verdict.
fn classify_risk(
    total_score: u32,
    patterns: &[PatternMatch],
    indicators: ContextIndicators,
) -> RiskLevel {
    if total_score >= 60 {
        return RiskLevel::Abuse;
    }
    if total_score >= 15 {
        return RiskLevel::Concerning;
    }

    if indicators.escalation && total_score >= 20 {
        return RiskLevel::Abuse;
    }
    if indicators.victim_blaming && total_score >= 25 {
        return RiskLevel::Abuse;
    }
    if indicators.power_imbalance && total_score >= 20 {
        return RiskLevel::Concerning;
    }

    let categories_hit = patterns.len();
    if categories_hit >= 6 {
        return RiskLevel::Abuse;
    }
    if categories_hit >= 2 {
        return RiskLevel::Concerning;
    }

    let key_occurrences: usize = patterns
        .iter()
        .filter(|p| KEY_CATEGORIES.contains(&p.category.as_str()))
        .map(|p| p.count)
        .sum();
    if key_occurrences >= 2 {
        return RiskLevel::Abuse;
    }
    if key_occurrences >= 1 && total_score >= 10 {
        return RiskLevel::Concerning;
    }

    RiskLevel::Safe
}

/// Per-speaker participation figures. Side channel only — not part of
/// the risk ladder.
pub fn analyze_dynamics(conversation_text: &str) -> Dynamics {
    let conversation = parse_conversation(conversation_text);
    let total = conversation.total_messages;

    let mut speakers = Vec::new();
    for (speaker, count) in &conversation.speaker_counts {
        let lengths: usize = conversation
            .messages
            .iter()
            .filter(|m| &m.speaker == speaker)
            .map(|m| m.length)
            .sum();
        let avg_length = lengths as f64 / *count as f64;
        let share = if total > 0 {
            *count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        speakers.push(SpeakerDynamics {
            speaker: speaker.clone(),
            messages: *count,
            avg_length,
            share,
        });
    }

    let is_one_sided = if speakers.len() >= 2 {
        let max = speakers.iter().map(|s| s.share).fold(f64::MIN, f64::max);
        let min = speakers.iter().map(|s| s.share).fold(f64::MAX, f64::min);
        max - min > ONE_SIDED_GAP
    } else {
        false
    };

    Dynamics {
        speakers,
        total_messages: total,
        is_one_sided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::detection::types::Severity;

    // ── Category scanning ──────────────────────────────────────

    #[test]
    fn clean_text_detects_nothing() {
        let result = detect("A: How was your day?\nB: Pretty good, thanks for asking.");
        assert!(result.patterns.is_empty());
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn gaslighting_three_occurrences() {
        let result =
            detect("That never happened. You're imagining things. You're making that up.");
        let gas = result
            .patterns
            .iter()
            .find(|p| p.category == "gaslighting")
            .expect("gaslighting should be detected");
        assert!(gas.count >= 3);
        assert_eq!(gas.samples.len(), 3);
        assert_eq!(gas.severity, Severity::High);
        assert_eq!(gas.score, gas.count as u32 * 7);
        assert!(result.risk_level >= RiskLevel::Concerning);
    }

    #[test]
    fn samples_capped_at_three() {
        let result = detect(
            "you're crazy. you're crazy. you're crazy. you're crazy. you're crazy.",
        );
        let gas = result
            .patterns
            .iter()
            .find(|p| p.category == "gaslighting")
            .unwrap();
        assert_eq!(gas.count, 5);
        assert_eq!(gas.samples.len(), 3);
    }

    #[test]
    fn matching_is_case_insensitive_via_lowercasing() {
        let result = detect("THAT NEVER HAPPENED and You're Crazy");
        assert!(result.patterns.iter().any(|p| p.category == "gaslighting"));
    }

    #[test]
    fn scan_is_cross_message() {
        // Trigger phrase split across speaker-labelled lines still counts
        // within each line; whole-text scan sees both lines.
        let result = detect("A: that never happened\nB: i know it did\nA: you're crazy");
        let gas = result
            .patterns
            .iter()
            .find(|p| p.category == "gaslighting")
            .unwrap();
        assert_eq!(gas.count, 2);
    }

    // ── Context indicators ─────────────────────────────────────

    #[test]
    fn escalation_indicator_fires() {
        let result = detect("I'm losing my temper with you");
        assert!(result.indicators.escalation);
        assert!(!result.indicators.victim_blaming);
    }

    #[test]
    fn victim_blaming_indicator_fires() {
        let result = detect("you brought this on yourself");
        assert!(result.indicators.victim_blaming);
    }

    #[test]
    fn power_imbalance_indicator_fires() {
        let result = detect("I make the decisions around here, you need me");
        assert!(result.indicators.power_imbalance);
    }

    // ── Risk ladder ────────────────────────────────────────────

    #[test]
    fn ladder_score_sixty_is_abuse() {
        let level = classify_risk(60, &[], ContextIndicators::default());
        assert_eq!(level, RiskLevel::Abuse);
    }

    #[test]
    fn ladder_score_fifteen_is_concerning() {
        let level = classify_risk(15, &[], ContextIndicators::default());
        assert_eq!(level, RiskLevel::Concerning);
    }

    #[test]
    fn ladder_score_below_fifteen_no_patterns_is_safe() {
        let level = classify_risk(14, &[], ContextIndicators::default());
        assert_eq!(level, RiskLevel::Safe);
    }

    #[test]
    fn ladder_monotone_in_score_with_fixed_inputs() {
        // With patterns and indicators held fixed (empty here), raising the
        // score never lowers the verdict.
        let mut last = RiskLevel::Safe;
        for score in 0..=100 {
            let level = classify_risk(score, &[], ContextIndicators::default());
            assert!(level >= last, "level dropped at score {score}");
            last = level;
        }
    }

    #[test]
    fn two_categories_is_concerning() {
        let patterns = vec![
            mk_pattern("sarcasm", Severity::Low, 1),
            mk_pattern("passive_aggressive", Severity::Medium, 1),
        ];
        let level = classify_risk(6, &patterns, ContextIndicators::default());
        assert_eq!(level, RiskLevel::Concerning);
    }

    #[test]
    fn six_categories_is_abuse() {
        let patterns: Vec<_> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|c| mk_pattern(c, Severity::Low, 1))
            .collect();
        let level = classify_risk(12, &patterns, ContextIndicators::default());
        assert_eq!(level, RiskLevel::Abuse);
    }

    #[test]
    fn two_key_category_occurrences_never_safe() {
        let patterns = vec![mk_pattern("threats", Severity::Critical, 1)];
        // One threat occurrence at weight 10 → score 10 → concerning via
        // the key-category rule; a second occurrence → abuse.
        let level = classify_risk(10, &patterns, ContextIndicators::default());
        assert!(level >= RiskLevel::Concerning);

        let patterns = vec![mk_pattern("gaslighting", Severity::High, 2)];
        let level = classify_risk(14, &patterns, ContextIndicators::default());
        assert_eq!(level, RiskLevel::Abuse);
    }

    #[test]
    fn threat_text_end_to_end_not_safe() {
        let result = detect("I'll make you pay. You'll regret this.");
        assert!(result.risk_level >= RiskLevel::Concerning);
    }

    // ── Dynamics ───────────────────────────────────────────────

    #[test]
    fn dynamics_one_sided_nine_of_ten() {
        let mut text = String::new();
        for i in 0..9 {
            text.push_str(&format!("Alex: message number {i}\n"));
        }
        text.push_str("Sam: one reply\n");
        let dynamics = analyze_dynamics(&text);
        assert_eq!(dynamics.total_messages, 10);
        // 90% vs 10% share: an 80-point gap exceeds the 30-point limit.
        assert!(dynamics.is_one_sided);
    }

    #[test]
    fn dynamics_balanced_pair_not_one_sided() {
        let dynamics = analyze_dynamics("A: hi\nB: hello\nA: how are you\nB: fine");
        assert!(!dynamics.is_one_sided);
    }

    #[test]
    fn dynamics_single_speaker_not_one_sided() {
        let dynamics = analyze_dynamics("A: talking\nA: to myself");
        assert!(!dynamics.is_one_sided);
    }

    #[test]
    fn dynamics_empty_input() {
        let dynamics = analyze_dynamics("");
        assert_eq!(dynamics.total_messages, 0);
        assert!(!dynamics.is_one_sided);
        assert!(dynamics.speakers.is_empty());
    }

    fn mk_pattern(category: &str, severity: Severity, count: usize) -> PatternMatch {
        PatternMatch {
            category: category.to_string(),
            description: String::new(),
            severity,
            samples: vec![],
            count,
            score: count as u32 * severity.weight(),
        }
    }
}
