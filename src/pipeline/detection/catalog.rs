//! Static rule catalog for the pattern detection engine.
//!
//! Categories and trigger phrases are fixed at compile time and compiled
//! into one alternation regex per category on first use. Triggers are
//! literal phrases matched against the lowercased conversation text, so
//! no case-insensitive flag is needed.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Severity;

/// A compiled category rule: one regex covering all trigger phrases.
pub struct CategoryRule {
    pub category: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    pub regex: Regex,
}

fn rule(
    category: &'static str,
    severity: Severity,
    description: &'static str,
    triggers: &[&str],
) -> CategoryRule {
    let alternation = triggers
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    CategoryRule {
        category,
        severity,
        description,
        regex: Regex::new(&alternation).expect("Invalid trigger phrase in rule catalog"),
    }
}

/// The full category catalog. Loaded once at first detection call; any
/// malformed trigger is fatal at that point, never at request time.
pub static CATALOG: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    vec![
        rule(
            "gaslighting",
            Severity::High,
            "Making someone question their reality, memory, or sanity",
            &[
                "that never happened",
                "you're imagining things",
                "you're making that up",
                "that's not what i said",
                "you're remembering it wrong",
                "you're crazy",
                "you're delusional",
                "that's all in your head",
                "you're confused",
                "you're misremembering",
                "that's not how it went",
                "you're twisting my words",
                "i never said that",
                "you're hearing things",
                "that's not what happened",
                "you're making it up",
                "you're lying about that",
                "that's not true",
                "you're wrong about that",
                "you're mistaken",
            ],
        ),
        rule(
            "guilt_tripping",
            Severity::Medium,
            "Using guilt to manipulate behavior and compliance",
            &[
                "if you loved me",
                "after all i've done for you",
                "you're ungrateful",
                "i do everything for you",
                "you don't appreciate me",
                "i sacrifice so much for you",
                "you're selfish",
                "you don't care about me",
                "you're breaking my heart",
                "i give up everything for you",
                "you're hurting me",
                "i'm always there for you",
                "you never think about me",
                "i put you first always",
                "you're so ungrateful",
                "after everything i've given you",
                "you're taking me for granted",
                "i deserve better than this",
                "you're making me feel worthless",
                "i'm not asking for much",
            ],
        ),
        rule(
            "threats",
            Severity::Critical,
            "Direct or implied threats to control or intimidate",
            &[
                "i'll leave you",
                "you'll be sorry",
                "i'll make you pay",
                "you'll regret this",
                "i'll hurt myself",
                "i'll kill myself",
                "you'll never find someone like me",
                "i'll ruin your life",
                "you'll lose everything",
                "i'll destroy you",
                "you'll pay for this",
                "i'll make you suffer",
                "you'll wish you never met me",
                "i'll take everything from you",
                "you'll be alone forever",
                "i'll hurt someone you love",
                "you'll never be happy again",
                "i'll make sure you suffer",
                "you'll get what's coming to you",
                "i'll make you miserable",
            ],
        ),
        rule(
            "control_tactics",
            Severity::High,
            "Attempts to control behavior, choices, or decisions",
            &[
                "you can't",
                "you're not allowed",
                "i forbid you",
                "you must",
                "you have to",
                "don't you dare",
                "you better not",
                "i won't let you",
                "you're not going to",
                "i don't want you to",
                "you shouldn't",
                "i don't allow",
                "you're forbidden",
                "i won't permit",
                "you're not permitted",
                "i control this",
                "you need my permission",
                "i decide what you do",
                "you'll do as i say",
                "i'm in charge here",
            ],
        ),
        rule(
            "emotional_manipulation",
            Severity::Medium,
            "Invalidating emotions and making someone feel wrong for feeling",
            &[
                "you're too sensitive",
                "you're overreacting",
                "you're being dramatic",
                "you're making a big deal",
                "you're being ridiculous",
                "you're being childish",
                "grow up",
                "get over it",
                "stop crying",
                "you're being emotional",
                "you're hysterical",
                "you're irrational",
                "you're being stupid",
                "you're acting crazy",
                "you're being paranoid",
                "you're overthinking",
                "you're being negative",
                "you're always complaining",
                "you're being difficult",
                "you're impossible to deal with",
            ],
        ),
        rule(
            "isolation_attempts",
            Severity::High,
            "Attempting to cut someone off from their support system",
            &[
                "your friends don't like me",
                "your family is toxic",
                "they're trying to break us up",
                "don't listen to them",
                "they don't understand us",
                "they're jealous",
                "they're bad influences",
                "you shouldn't trust them",
                "they're manipulating you",
                "they don't care about you",
                "they're using you",
                "they're not good for you",
                "they're trying to control you",
                "they're brainwashing you",
                "they're turning you against me",
                "they're the problem",
                "you don't need them",
                "i'm all you need",
                "they're holding you back",
                "they're jealous of our relationship",
            ],
        ),
        rule(
            "blame_shifting",
            Severity::High,
            "Making someone else responsible for your actions or behavior",
            &[
                "you made me do this",
                "it's your fault",
                "you caused this",
                "you started it",
                "you provoked me",
                "you pushed me to this",
                "you're the problem",
                "you're the one who",
                "you made me angry",
                "you're making me act this way",
                "you're forcing me to",
                "you're driving me crazy",
                "you're making me lose control",
                "you're the reason i'm like this",
                "you're destroying our relationship",
                "you're ruining everything",
                "you're the one with issues",
                "you're the toxic one",
                "you're the abusive one",
                "you're the one who needs help",
            ],
        ),
        rule(
            "minimization",
            Severity::Medium,
            "Downplaying concerns, feelings, or experiences",
            &[
                "it's not that bad",
                "you're exaggerating",
                "it's not a big deal",
                "other people have it worse",
                "you're lucky",
                "it could be worse",
                "stop complaining",
                "it's not worth getting upset about",
                "you're making mountains out of molehills",
                "it's not important",
                "you're being silly",
                "it's not worth it",
                "you're being petty",
                "it's nothing",
                "it's not worth your time",
                "it's not that serious",
            ],
        ),
        rule(
            "love_bombing",
            Severity::Medium,
            "Excessive affection used as manipulation tactic",
            &[
                "i love you more than anything",
                "you're my everything",
                "i can't live without you",
                "you're perfect",
                "i've never felt this way",
                "you're my soulmate",
                "i'll do anything for you",
                "you're the only one for me",
                "you're my world",
                "i'm nothing without you",
                "you're my reason for living",
                "i'll die without you",
                "i'm obsessed with you",
                "you're my addiction",
                "i can't get enough of you",
                "you're my drug",
                "i'm addicted to you",
                "you're my life",
                "i worship you",
            ],
        ),
        rule(
            "intimidation",
            Severity::High,
            "Using fear or intimidation to control behavior",
            &[
                "you don't want to make me angry",
                "you're pushing my buttons",
                "i'm warning you",
                "you're testing my patience",
                "don't make me",
                "you're asking for trouble",
                "i'm not someone you want to mess with",
                "you'll learn not to cross me",
                "you're playing with fire",
                "you're walking on thin ice",
                "you're skating on thin ice",
                "you're treading dangerous ground",
                "you're pushing your luck",
                "you're asking for it",
                "you're looking for trouble",
                "you're making a mistake",
                "you're being foolish",
                "you're being reckless",
            ],
        ),
        rule(
            "financial_control",
            Severity::High,
            "Using money or financial control as manipulation",
            &[
                "you can't afford it",
                "we don't have money for that",
                "you're wasting money",
                "you're being irresponsible",
                "i control the money",
                "you don't need that",
                "you're spending too much",
                "you're being greedy",
                "you don't deserve that",
                "you're being materialistic",
                "you're shallow",
                "you only care about money",
                "you're using me for money",
                "you're a gold digger",
                "you're only with me for money",
                "you're being manipulative",
                "you're trying to control me",
                "you're being abusive",
            ],
        ),
        rule(
            "sexual_coercion",
            Severity::Critical,
            "Using manipulation to coerce sexual activity",
            &[
                "if you loved me you would",
                "you owe me",
                "you're not attracted to me",
                "you're rejecting me",
                "you're being cruel",
                "you're being mean",
                "you're being unfair",
                "you're being unreasonable",
                "you're being stubborn",
                "you're being immature",
                "you're being inconsiderate",
                "you're being thoughtless",
                "you're being cold",
                "you're being distant",
                "you're being unloving",
            ],
        ),
        rule(
            "passive_aggressive",
            Severity::Medium,
            "Passive-aggressive behavior and indirect hostility",
            &[
                "oh great",
                "that's fine",
                "whatever",
                "i'm used to it",
                "i don't care",
                "do whatever you want",
                "i'm not mad",
                "it's whatever",
                "i'm fine",
                "nothing's wrong",
                "i'm not upset",
                "it doesn't matter",
                "i don't mind",
                "it's up to you",
                "i'm not bothered",
                "i'm not complaining",
                "i'm not saying anything",
                "i'm not going to argue",
                "i'm not going to fight",
            ],
        ),
        rule(
            "sarcasm",
            Severity::Low,
            "Sarcastic comments and tone",
            &[
                "oh wonderful",
                "that's just great",
                "how lovely",
                "what a surprise",
                "how nice",
                "that's perfect",
                "exactly what i wanted",
                "just what i needed",
                "how thoughtful",
                "how considerate",
                "that's helpful",
                "that's useful",
                "how kind",
                "how generous",
                "how sweet",
                "how caring",
                "how loving",
                "how romantic",
                "how perfect",
            ],
        ),
    ]
});

// ── Context indicator phrase sets ───────────────────────────
//
// Checked with plain substring containment, independently of category
// scoring. One hit per set is enough.

pub static ESCALATION_PHRASES: &[&str] = &[
    "i'm getting angry",
    "you're making me mad",
    "i'm losing my temper",
    "you're pushing me too far",
    "i'm about to lose it",
    "you're testing my limits",
    "i'm reaching my breaking point",
    "you're driving me crazy",
    "i'm losing control",
    "you're making me snap",
];

pub static VICTIM_BLAMING_PHRASES: &[&str] = &[
    "you asked for it",
    "you deserved it",
    "you brought this on yourself",
    "you made me do this",
    "you're asking for trouble",
    "you're looking for a fight",
    "you're being difficult",
    "you're being unreasonable",
    "you're being impossible",
    "you're being stubborn",
];

pub static POWER_IMBALANCE_PHRASES: &[&str] = &[
    "i'm the man here",
    "i'm in charge",
    "i make the decisions",
    "you don't get a say",
    "i know what's best",
    "you're not smart enough",
    "you're not capable",
    "you need me",
    "you can't survive without me",
    "you're helpless without me",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_fourteen_categories() {
        assert_eq!(CATALOG.len(), 14);
    }

    #[test]
    fn catalog_categories_are_unique() {
        let mut names: Vec<&str> = CATALOG.iter().map(|r| r.category).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn catalog_regexes_compile_and_match() {
        let rule = CATALOG
            .iter()
            .find(|r| r.category == "gaslighting")
            .unwrap();
        assert!(rule.regex.is_match("that never happened"));
        assert!(!rule.regex.is_match("a perfectly normal sentence"));
    }

    #[test]
    fn threats_and_sexual_coercion_are_critical() {
        for name in ["threats", "sexual_coercion"] {
            let rule = CATALOG.iter().find(|r| r.category == name).unwrap();
            assert_eq!(rule.severity, Severity::Critical);
        }
    }

    #[test]
    fn sarcasm_is_low_tier() {
        let rule = CATALOG.iter().find(|r| r.category == "sarcasm").unwrap();
        assert_eq!(rule.severity, Severity::Low);
    }

    #[test]
    fn apostrophe_triggers_match_literally() {
        let rule = CATALOG
            .iter()
            .find(|r| r.category == "emotional_manipulation")
            .unwrap();
        assert!(rule.regex.is_match("you're too sensitive about this"));
    }

    #[test]
    fn context_phrase_sets_have_ten_entries() {
        assert_eq!(ESCALATION_PHRASES.len(), 10);
        assert_eq!(VICTIM_BLAMING_PHRASES.len(), 10);
        assert_eq!(POWER_IMBALANCE_PHRASES.len(), 10);
    }
}
