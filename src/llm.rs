use crate::config::{ApiKey, Config, GenerationConfig};
use crate::error::SessionError;
use crate::safety::{SafetyPolicy, SafetySetting};
use crate::transcript::{Message, Role};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Parameters a session is created with and reuses for every send
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionParams {
    pub generation: GenerationConfig,
    pub safety: SafetyPolicy,
}

/// One turn of replayed history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl From<&Message> for Turn {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role(),
            text: message.text().to_string(),
        }
    }
}

/// Handle to a conversational context on the provider side.
///
/// The Gemini REST API is stateless, so the context is the replayed history
/// plus the parameters it was created with. A successful send appends the
/// exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    id: Uuid,
    model: String,
    history: Vec<Turn>,
    params: SessionParams,
}

impl ChatSession {
    pub fn new(model: impl Into<String>, history: &[Message], params: SessionParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            history: history.iter().map(Turn::from).collect(),
            params,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Record a completed exchange so the next send carries it as context
    pub fn record_exchange(&mut self, user_text: &str, reply: &str) {
        self.history.push(Turn {
            role: Role::User,
            text: user_text.to_string(),
        });
        self.history.push(Turn {
            role: Role::Bot,
            text: reply.to_string(),
        });
    }
}

/// The model session adapter.
///
/// One attempt per call; failures are reported upward and never retried.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Create a session seeded with `history`
    async fn create_session(
        &self,
        history: &[Message],
        params: &SessionParams,
    ) -> Result<ChatSession, SessionError>;

    /// Send one user utterance on `session` and return the reply text
    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, SessionError>;
}

/// History must open with a user turn, as the provider requires
pub fn validate_history(history: &[Message]) -> Result<(), SessionError> {
    match history.first() {
        Some(first) if first.role() != Role::User => Err(SessionError::initialization(format!(
            "history must start with a user turn, found {:?}",
            first.role()
        ))),
        _ => Ok(()),
    }
}

// Wire format of `models/{model}:generateContent`

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: WireGenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub role: &'static str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    pub temperature: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl From<GenerationConfig> for WireGenerationConfig {
    fn from(config: GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Subset of the `models/{model}` resource logged on session creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub input_token_limit: Option<u32>,
    pub output_token_limit: Option<u32>,
}

/// Build the `generateContent` body: session history followed by the new turn
pub fn build_request<'a>(
    history: &'a [Turn],
    text: &'a str,
    params: &SessionParams,
) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = history
        .iter()
        .map(|turn| Content {
            role: turn.role.wire_name(),
            parts: vec![Part { text: &turn.text }],
        })
        .collect();
    contents.push(Content {
        role: Role::User.wire_name(),
        parts: vec![Part { text }],
    });

    GenerateContentRequest {
        contents,
        generation_config: params.generation.into(),
        safety_settings: params.safety.settings(),
    }
}

/// Pull the reply text out of a `generateContent` response
fn extract_reply(response: GenerateContentResponse) -> Result<String, SessionError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(SessionError::send(format!("prompt blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| SessionError::send("no candidates in response"))?;

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(SessionError::send(format!(
            "empty response (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

/// Best-effort message from a non-2xx body
fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    format!("HTTP {}: {}", status, detail)
}

/// Gemini client over the Generative Language REST API
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<ApiKey>,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &Config, api_key: Option<ApiKey>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }

    /// Fetch the model resource; doubles as a credential check
    async fn fetch_model(&self, api_key: &ApiKey) -> Result<ModelInfo, SessionError> {
        let response = self
            .client
            .get(self.model_url())
            .header(API_KEY_HEADER, api_key.expose())
            .send()
            .await
            .map_err(|e| SessionError::initialization(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::initialization(api_error_message(status, &body)));
        }

        response
            .json::<ModelInfo>()
            .await
            .map_err(|e| SessionError::initialization(format!("malformed model resource: {}", e)))
    }
}

#[async_trait]
impl ModelBackend for GeminiClient {
    async fn create_session(
        &self,
        history: &[Message],
        params: &SessionParams,
    ) -> Result<ChatSession, SessionError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SessionError::initialization("no API key configured"))?;
        validate_history(history)?;

        let info = self.fetch_model(api_key).await?;
        let session = ChatSession::new(&self.model, history, *params);
        info!(
            session = %session.id(),
            model = %info.name,
            replayed = history.len(),
            "Created chat session"
        );
        Ok(session)
    }

    async fn send(&self, session: &mut ChatSession, text: &str) -> Result<String, SessionError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SessionError::send("no API key configured"))?;
        let url = format!("{}/models/{}:generateContent", self.base_url, session.model());

        debug!(session = %session.id(), turns = session.history().len(), "Gemini API request");

        let response = {
            let body = build_request(session.history(), text, session.params());
            self.client
                .post(&url)
                .header(API_KEY_HEADER, api_key.expose())
                .json(&body)
                .send()
                .await
                .map_err(|e| SessionError::send(e.to_string()))?
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = api_error_message(status, &body);
            warn!(session = %session.id(), %message, "Gemini API error");
            return Err(SessionError::send(message));
        }

        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| SessionError::send(format!("malformed response: {}", e)))?;
        let reply = extract_reply(parsed)?;

        session.record_exchange(text, &reply);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::HarmBlockThreshold;

    #[test]
    fn request_replays_history_then_new_turn() {
        let history = vec![
            Turn { role: Role::User, text: "Hello".to_string() },
            Turn { role: Role::Bot, text: "Hi there!".to_string() },
        ];
        let params = SessionParams::default();
        let body = serde_json::to_value(build_request(&history, "How are you?", &params)).unwrap();

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "How are you?");

        assert_eq!(body["generationConfig"]["topK"], 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn request_carries_configured_thresholds() {
        let params = SessionParams {
            safety: SafetyPolicy::uniform(HarmBlockThreshold::BlockOnlyHigh),
            ..SessionParams::default()
        };
        let body = serde_json::to_value(build_request(&[], "hi", &params)).unwrap();
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_ONLY_HIGH");
    }

    #[test]
    fn reply_joins_text_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "there!" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_reply(response).unwrap(), "Hi there!");
    }

    #[test]
    fn blocked_prompt_is_a_send_error() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        assert_eq!(
            extract_reply(response),
            Err(SessionError::send("prompt blocked: SAFETY"))
        );
    }

    #[test]
    fn safety_stop_without_text_is_a_send_error() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = extract_reply(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn history_must_open_with_user() {
        assert!(validate_history(&[]).is_ok());
        assert!(validate_history(&[Message::user("hi")]).is_ok());
        assert!(matches!(
            validate_history(&[Message::bot("hi")]),
            Err(SessionError::Initialization(_))
        ));
    }

    #[test]
    fn api_error_prefers_structured_message() {
        let message = api_error_message(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid."}}"#,
        );
        assert_eq!(message, "HTTP 400 Bad Request: API key not valid.");
    }
}
