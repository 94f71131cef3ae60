//! OpenAI-compatible chat completion client
//!
//! Defaults to Google's OpenAI-compatible Gemini endpoint; any service that
//! speaks `POST {base}/chat/completions` works.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::USER_AGENT;
use crate::types::{ClientError, Completion, CompletionProvider};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refusal: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            refusal: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Chat completion client
pub struct ChatCompletionClient {
    http_client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl ChatCompletionClient {
    /// Without an API key every completion fails with [`ClientError::NotConfigured`]
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            http_client,
            api_key,
            base_url,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    fn request_for(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", SYSTEM_PROMPT),
                ChatMessage::new("user", prompt),
            ],
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, ClientError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ClientError::NotConfigured("AI_PROVIDER_API_KEY / OPENAI_API_KEY".to_string())
        })?;

        tracing::debug!(model = %self.model, "Requesting chat completion");

        let response = self
            .http_client
            .post(format!("{}chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&self.request_for(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        best_choice(body)
    }
}

/// Pick the answer to use from a response
fn best_choice(body: ChatCompletionResponse) -> Result<Completion, ClientError> {
    let num_choices = body.choices.len();
    if num_choices > 1 {
        tracing::warn!(
            num_choices,
            "Assistant returned multiple choices; indicates uncertainty of its response"
        );
    }

    let message = body
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| ClientError::Parse("0 choices in response".to_string()))?;

    Ok(match message.refusal {
        Some(reason) => Completion::Refused(reason),
        None => Completion::Text(message.content),
    })
}
