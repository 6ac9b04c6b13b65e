use super::types::InsightContext;

/// System prompt: role framing plus the strict JSON reply contract the
/// parser depends on.
pub fn system_prompt() -> String {
    "You are an expert in recognizing emotional abuse and manipulation in conversations. \
     Analyze the conversation with care and empathy for potential victims.\n\n\
     Respond ONLY with a JSON object of this exact shape:\n\
     {\n\
     \x20 \"risk_level\": \"safe\" | \"concerning\" | \"abuse\",\n\
     \x20 \"patterns\": [{\"name\": \"...\", \"description\": \"...\", \"severity\": \"low\" | \"medium\" | \"high\" | \"critical\", \"evidence\": \"...\", \"confidence\": 0.0}],\n\
     \x20 \"summary\": \"...\",\n\
     \x20 \"red_flags\": [\"...\"],\n\
     \x20 \"suggestions\": [\"...\"],\n\
     \x20 \"reasoning\": \"...\",\n\
     \x20 \"confidence\": 0.0\n\
     }\n\n\
     Do not wrap the JSON in markdown fences and do not add commentary outside it."
        .to_string()
}

/// User prompt: the conversation enriched with retrieved definitions and
/// the rule engine's findings so the model reasons from the same evidence.
pub fn build_prompt(conversation: &str, context: &InsightContext) -> String {
    let mut prompt = String::new();

    if !context.rag_patterns.is_empty() {
        prompt.push_str("Reference definitions of abuse patterns:\n");
        for def in &context.rag_patterns {
            prompt.push_str(&format!("- {}: {}\n", def.name, def.definition));
        }
        prompt.push('\n');
    }

    if !context.detected_patterns.is_empty() {
        prompt.push_str("Patterns already flagged by automated screening:\n");
        for detected in &context.detected_patterns {
            prompt.push_str(&format!(
                "- {}: {}\n",
                detected.category, detected.description
            ));
        }
        prompt.push('\n');
    }

    prompt.push_str("Conversation to analyze:\n");
    prompt.push_str(conversation);
    prompt.push_str(
        "\n\nAssess the conversation for emotional abuse, manipulation, and unhealthy \
         dynamics. Confirm or refute the flagged patterns and report anything they missed.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::super::types::DetectedPatternRef;
    use super::*;
    use crate::knowledge::PatternDefinition;

    #[test]
    fn system_prompt_states_json_contract() {
        let prompt = system_prompt();
        assert!(prompt.contains("\"risk_level\""));
        assert!(prompt.contains("\"confidence\""));
    }

    #[test]
    fn prompt_includes_conversation_and_context() {
        let context = InsightContext {
            rag_patterns: vec![PatternDefinition {
                name: "gaslighting".to_string(),
                definition: "Denying someone's reality".to_string(),
                keywords: vec![],
            }],
            detected_patterns: vec![DetectedPatternRef {
                category: "threats".to_string(),
                description: "Threatening language".to_string(),
            }],
        };
        let prompt = build_prompt("A: you are crazy", &context);
        assert!(prompt.contains("gaslighting: Denying someone's reality"));
        assert!(prompt.contains("threats: Threatening language"));
        assert!(prompt.contains("A: you are crazy"));
    }

    #[test]
    fn empty_context_omits_sections() {
        let prompt = build_prompt("A: hello", &InsightContext::default());
        assert!(!prompt.contains("Reference definitions"));
        assert!(!prompt.contains("automated screening"));
        assert!(prompt.contains("A: hello"));
    }
}
