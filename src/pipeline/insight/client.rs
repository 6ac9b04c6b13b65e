use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::prompt::{build_prompt, system_prompt};
use super::types::{AiInsight, InsightContext};
use super::{InsightError, InsightProvider};
use crate::config::InsightConfig;

/// HTTP client for an OpenAI-compatible chat completions endpoint
/// (NVIDIA NIM by default). All failures collapse into the documented
/// fallback verdict so the pipeline never stalls on the network.
pub struct NimClient {
    config: InsightConfig,
    client: reqwest::blocking::Client,
}

impl NimClient {
    pub fn new(config: InsightConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Client configured from CLEARSIGNAL_LLM_* environment variables.
    pub fn from_env() -> Self {
        Self::new(InsightConfig::from_env())
    }

    /// Verify the endpoint is reachable and the credentials are accepted.
    pub fn health_check(&self) -> Result<(), InsightError> {
        let url = format!("{}/models", self.config.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = self.api_key()? {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InsightError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    fn api_key(&self) -> Result<Option<&str>, InsightError> {
        if !self.config.api_key.is_empty() {
            Ok(Some(&self.config.api_key))
        } else if self.config.is_hosted_endpoint() {
            Err(InsightError::MissingApiKey)
        } else {
            Ok(None)
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> InsightError {
        if e.is_connect() {
            InsightError::Connection(self.config.base_url.clone())
        } else if e.is_timeout() {
            InsightError::Timeout(self.config.timeout_secs)
        } else {
            InsightError::Http(e.to_string())
        }
    }

    fn request_insight(
        &self,
        conversation: &str,
        context: &InsightContext,
    ) -> Result<AiInsight, InsightError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let system = system_prompt();
        let user = build_prompt(conversation, context);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 1024,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key()? {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InsightError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| InsightError::ResponseParsing(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| InsightError::ResponseParsing("empty choices array".to_string()))?;

        parse_insight(content)
    }
}

/// Pull the JSON object out of the model reply, tolerating markdown
/// fences and surrounding prose.
pub fn parse_insight(content: &str) -> Result<AiInsight, InsightError> {
    let start = content
        .find('{')
        .ok_or_else(|| InsightError::ResponseParsing("no JSON object in reply".to_string()))?;
    let end = content
        .rfind('}')
        .ok_or_else(|| InsightError::ResponseParsing("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(InsightError::ResponseParsing(
            "malformed JSON object in reply".to_string(),
        ));
    }

    let insight: AiInsight = serde_json::from_str(&content[start..=end])
        .map_err(|e| InsightError::ResponseParsing(e.to_string()))?;
    Ok(insight.sanitize())
}

impl InsightProvider for NimClient {
    fn analyze(&self, conversation: &str, context: &InsightContext) -> AiInsight {
        match self.request_insight(conversation, context) {
            Ok(insight) => {
                debug!(
                    confidence = insight.confidence,
                    risk_level = %insight.risk_level,
                    "AI insight received"
                );
                insight
            }
            Err(e) => {
                warn!(error = %e, "AI analysis failed, using fallback verdict");
                AiInsight::fallback()
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}
