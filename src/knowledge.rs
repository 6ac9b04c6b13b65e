//! Knowledge-base loading: pattern definitions for retrieval and help
//! resources for the presentation layer.
//!
//! Both loaders are total at the public surface — a missing or malformed
//! file degrades to an empty list or to the compiled-in defaults, with a
//! warning in the log.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Knowledge file read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Knowledge file parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One retrievable pattern definition for collaborator context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub name: String,
    pub definition: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A crisis hotline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotline {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
}

/// An online support resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Website {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Help resources consumed by the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelpResources {
    #[serde(default)]
    pub hotlines: Vec<Hotline>,
    #[serde(default)]
    pub websites: Vec<Website>,
    #[serde(default)]
    pub safety_planning_tips: Vec<String>,
    #[serde(default)]
    pub emergency_protocols: BTreeMap<String, String>,
}

/// On-disk shape of `pattern_knowledge.json`.
#[derive(Deserialize)]
struct PatternKnowledgeFile {
    #[serde(default)]
    patterns: Vec<PatternDefinition>,
}

/// Load pattern definitions from the data directory.
///
/// Missing or malformed files degrade to an empty list — retrieval then
/// yields an empty set, which the rest of the pipeline tolerates.
pub fn load_pattern_definitions() -> Vec<PatternDefinition> {
    let path = config::data_dir().join("pattern_knowledge.json");
    match read_pattern_definitions(&path) {
        Ok(defs) => defs,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Pattern knowledge unavailable, using empty set");
            Vec::new()
        }
    }
}

fn read_pattern_definitions(path: &Path) -> Result<Vec<PatternDefinition>, KnowledgeError> {
    let raw = std::fs::read_to_string(path)?;
    let file: PatternKnowledgeFile = serde_json::from_str(&raw)?;
    Ok(file.patterns)
}

/// Load help resources, falling back to the compiled-in defaults when
/// the resources file is missing or unreadable.
pub fn load_resources() -> HelpResources {
    let path = config::data_dir().join("resources.json");
    match read_resources(&path) {
        Ok(resources) => resources,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Resources file unavailable, using defaults");
            default_resources()
        }
    }
}

fn read_resources(path: &Path) -> Result<HelpResources, KnowledgeError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Built-in help resources used when no resources file is present.
pub fn default_resources() -> HelpResources {
    HelpResources {
        hotlines: vec![
            Hotline {
                name: "National Domestic Violence Hotline".into(),
                phone: "1-800-799-7233".into(),
                website: "https://www.thehotline.org/".into(),
                description: "24/7 support for domestic violence survivors".into(),
            },
            Hotline {
                name: "Crisis Text Line".into(),
                phone: "Text HOME to 741741".into(),
                website: "https://www.crisistextline.org/".into(),
                description: "24/7 crisis support via text message".into(),
            },
            Hotline {
                name: "National Suicide Prevention Lifeline".into(),
                phone: "988".into(),
                website: "https://suicidepreventionlifeline.org/".into(),
                description: "24/7 suicide prevention and crisis support".into(),
            },
        ],
        websites: vec![
            Website {
                name: "Love is Respect".into(),
                url: "https://www.loveisrespect.org/".into(),
                description: "Resources for healthy relationships and abuse prevention".into(),
            },
            Website {
                name: "RAINN".into(),
                url: "https://www.rainn.org/".into(),
                description: "Rape, Abuse & Incest National Network".into(),
            },
        ],
        safety_planning_tips: vec![
            "Keep important documents in a safe place".into(),
            "Have a code word with trusted friends/family".into(),
            "Know your local domestic violence shelter".into(),
            "Keep emergency contacts easily accessible".into(),
        ],
        emergency_protocols: BTreeMap::from([
            (
                "immediate_danger".to_string(),
                "Call 911 or your local emergency number".to_string(),
            ),
            (
                "safe_exit".to_string(),
                "If you need to leave immediately, go to a safe place".to_string(),
            ),
            (
                "trusted_contact".to_string(),
                "Reach out to a trusted friend or family member".to_string(),
            ),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_pattern_definitions_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern_knowledge.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"patterns": [{{"name": "gaslighting", "definition": "Denying someone's reality", "keywords": ["never happened", "imagining"]}}]}}"#
        )
        .unwrap();

        let defs = read_pattern_definitions(&path).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "gaslighting");
        assert_eq!(defs[0].keywords.len(), 2);
    }

    #[test]
    fn missing_keywords_field_defaults_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern_knowledge.json");
        std::fs::write(
            &path,
            r#"{"patterns": [{"name": "threats", "definition": "Threatening language"}]}"#,
        )
        .unwrap();

        let defs = read_pattern_definitions(&path).unwrap();
        assert!(defs[0].keywords.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_pattern_definitions(Path::new("/nonexistent/pattern_knowledge.json"))
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::Io(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern_knowledge.json");
        std::fs::write(&path, "not json at all").unwrap();
        let err = read_pattern_definitions(&path).unwrap_err();
        assert!(matches!(err, KnowledgeError::Json(_)));
    }

    #[test]
    fn default_resources_have_hotlines() {
        let resources = default_resources();
        assert!(!resources.hotlines.is_empty());
        assert!(resources
            .hotlines
            .iter()
            .any(|h| h.phone.contains("1-800-799-7233")));
        assert!(!resources.safety_planning_tips.is_empty());
        assert!(resources.emergency_protocols.contains_key("immediate_danger"));
    }

    #[test]
    fn read_resources_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resources.json");
        let json = serde_json::to_string(&default_resources()).unwrap();
        std::fs::write(&path, json).unwrap();

        let resources = read_resources(&path).unwrap();
        assert_eq!(resources.hotlines.len(), 3);
        assert_eq!(resources.websites.len(), 2);
    }
}
