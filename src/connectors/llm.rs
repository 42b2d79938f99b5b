use super::config::{http_client, LlmConfig};
use super::errors::{error_for_response, ConnectorError};
use crate::models::{Message, Role};
use actix_web::web;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Instrument;

/// Normalized reply of a generative text API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Generated text; `None` when the upstream produced no candidate text
    pub text: Option<String>,
    pub finish_reason: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: None,
        }
    }
}

/// Turn-based generative text API
#[async_trait::async_trait]
pub trait LlmConnector: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<Completion, ConnectorError>;
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct Content {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct SystemInstruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
}

/// Opens the turn list when the context starts with a model reply.
pub(crate) const RESUME_PROMPT: &str = "Let's continue our conversation.";

/// Maps our roles onto Gemini's: `assistant` becomes `model`,
/// system turns move into `systemInstruction`.
/// Consecutive turns of one role are merged and the first turn is always `user`.
pub(crate) fn build_request(messages: &[Message]) -> GenerateRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(messages.len());
    let mut system = Vec::new();

    for message in messages {
        let role = match message.role {
            Role::System => {
                system.push(Part {
                    text: message.content.clone(),
                });
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };

        if contents.is_empty() && role == "model" {
            contents.push(Content {
                role: "user",
                parts: vec![Part {
                    text: RESUME_PROMPT.to_string(),
                }],
            });
        }

        let part = Part {
            text: message.content.clone(),
        };
        match contents.last_mut() {
            Some(last) if last.role == role => last.parts.push(part),
            _ => contents.push(Content {
                role,
                parts: vec![part],
            }),
        }
    }

    GenerateRequest {
        contents,
        system_instruction: if system.is_empty() {
            None
        } else {
            Some(SystemInstruction { parts: system })
        },
    }
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Every response shape we have seen from generative text endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    /// Gemini `generateContent`
    #[serde(default)]
    candidates: Vec<Candidate>,
    /// OpenAI-compatible chat/completions
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

pub(crate) fn normalize_response(body: &str) -> Result<Completion, ConnectorError> {
    let raw: RawResponse = serde_json::from_str(body)
        .map_err(|err| ConnectorError::InvalidResponse(format!("{}: {}", err, body)))?;

    if let Some(candidate) = raw.candidates.into_iter().next() {
        let text = candidate.content.map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        });
        return Ok(Completion {
            text: text.filter(|t| !t.is_empty()),
            finish_reason: candidate.finish_reason,
        });
    }

    if let Some(choice) = raw.choices.into_iter().next() {
        let text = choice
            .message
            .and_then(|message| message.content)
            .or(choice.text);
        return Ok(Completion {
            text: text.filter(|t| !t.is_empty()),
            finish_reason: choice.finish_reason,
        });
    }

    if let Some(reason) = raw.prompt_feedback.and_then(|feedback| feedback.block_reason) {
        return Err(ConnectorError::InvalidResponse(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    Ok(Completion::default())
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    endpoint: String,
    http_client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: LlmConfig) -> Result<Self, ConnectorError> {
        let http_client = http_client(config.timeout_secs)
            .map_err(|err| ConnectorError::Internal(format!("HTTP client error: {}", err)))?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            endpoint,
            http_client,
            api_key: config.api_key,
        })
    }
}

#[async_trait::async_trait]
impl LlmConnector for GeminiClient {
    async fn generate(&self, messages: &[Message]) -> Result<Completion, ConnectorError> {
        let span = tracing::info_span!("llm_generate", turns = messages.len());
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ConnectorError::NotConfigured("LLM API key is not set".to_string()))?;

        let resp = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&build_request(messages))
            .send()
            .instrument(span.clone())
            .await
            .map_err(|err| {
                tracing::error!(parent: &span, "generateContent request failed: {:?}", err);
                ConnectorError::from(err)
            })?;

        if !resp.status().is_success() {
            let err = error_for_response("LLM API", resp).await;
            tracing::error!(parent: &span, "generateContent error: {}", err);
            return Err(err);
        }

        let body = resp.text().await?;
        normalize_response(&body)
    }
}

pub mod mock {
    use super::*;

    /// Returns a fixed reply and counts calls.
    pub struct MockLlmConnector {
        reply: Result<String, String>,
        calls: AtomicUsize,
        last_request: std::sync::Mutex<Vec<Message>>,
    }

    impl MockLlmConnector {
        pub fn new(reply: impl Into<String>) -> Self {
            Self {
                reply: Ok(reply.into()),
                calls: AtomicUsize::new(0),
                last_request: std::sync::Mutex::new(vec![]),
            }
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                reply: Err(message.into()),
                ..Self::new("")
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Vec<Message> {
            self.last_request
                .lock()
                .map(|messages| messages.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl LlmConnector for MockLlmConnector {
        async fn generate(&self, messages: &[Message]) -> Result<Completion, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_request.lock() {
                *last = messages.to_vec();
            }
            match &self.reply {
                Ok(text) => Ok(Completion::text(text.clone())),
                Err(message) => Err(ConnectorError::HttpError(message.clone())),
            }
        }
    }
}

fn build(config: Option<&LlmConfig>, name: &str) -> Option<Arc<dyn LlmConnector>> {
    let config = config.filter(|c| c.enabled)?;
    match GeminiClient::new(config.clone()) {
        Ok(client) => {
            tracing::info!("Initializing {} connector: {}", name, config.base_url);
            Some(Arc::new(client))
        }
        Err(err) => {
            tracing::error!("Failed to initialize {} connector: {}", name, err);
            None
        }
    }
}

pub fn init(connector_config: &super::config::ConnectorConfig) -> web::Data<Arc<dyn LlmConnector>> {
    let connector = build(connector_config.llm.as_ref(), "LLM").unwrap_or_else(|| {
        tracing::warn!("LLM connector disabled - using mock");
        Arc::new(mock::MockLlmConnector::new(
            "The language model is not configured.",
        ))
    });
    web::Data::new(connector)
}

/// Summarizer backend; `None` when disabled.
pub fn init_summarizer(
    connector_config: &super::config::ConnectorConfig,
) -> Option<Arc<dyn LlmConnector>> {
    let connector = build(connector_config.summarizer.as_ref(), "summarizer");
    if connector.is_none() {
        tracing::warn!("Summarizer connector disabled - uploads will have no summary");
    }
    connector
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_maps_roles() {
        let request = build_request(&[
            Message::new(Role::System, "be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
        ]);
        let roles: Vec<&str> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec!["user", "model"]);
        assert_eq!(
            request.system_instruction,
            Some(SystemInstruction {
                parts: vec![Part {
                    text: "be brief".to_string()
                }]
            })
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn request_merges_repeated_roles() {
        let request = build_request(&[
            Message::user("q1"),
            Message::user("q1 again"),
            Message::assistant("r1"),
            Message::user("q2"),
        ]);
        let roles: Vec<&str> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(request.contents[0].parts.len(), 2);
    }

    #[test]
    fn request_never_starts_with_model() {
        let request = build_request(&[
            Message::assistant("r1"),
            Message::assistant("r2"),
            Message::user("q3"),
        ]);
        let roles: Vec<&str> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec!["user", "model", "user"]);
        assert_eq!(request.contents[0].parts[0].text, RESUME_PROMPT);
        assert_eq!(request.contents[1].parts.len(), 2);
    }

    #[test]
    fn request_without_system_omits_instruction() {
        let json = serde_json::to_value(build_request(&[Message::user("hi")])).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn normalizes_gemini_response() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let completion = normalize_response(body).unwrap();
        assert_eq!(completion.text.as_deref(), Some("Hello"));
        assert_eq!(completion.finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn normalizes_openai_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"},"finish_reason":"stop"}]}"#;
        let completion = normalize_response(body).unwrap();
        assert_eq!(completion.text.as_deref(), Some("hi there"));
    }

    #[test]
    fn empty_candidate_has_no_text() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        let completion = normalize_response(body).unwrap();
        assert_eq!(completion.text, None);
        assert_eq!(completion.finish_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(
            normalize_response(body),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn garbage_is_invalid_response() {
        assert!(matches!(
            normalize_response("<html>"),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }
}
