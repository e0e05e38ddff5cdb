//! Assistant implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::heuristics;
use crate::types::*;

/// Booking instructions sent ahead of every live conversation
pub const SYSTEM_PROMPT: &str = "You are a booking assistant that guides the user to: \
1) choose a service, 2) date/time, 3) location/contact (seller address), \
4) confirm payment amount and timeout. Keep answers concise and focused on booking.";

/// Something that answers booking chat messages
#[async_trait]
pub trait BookingAssistant: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn mode(&self) -> AssistantMode;

    /// Answer one user message
    async fn reply(&self, message: &str) -> Result<ChatReply>;
}

// ============================================================================
// Deterministic Assistant (mock mode, default)
// ============================================================================

/// Keyword-driven replies with no network access
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicAssistant;

impl DeterministicAssistant {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous form of [`BookingAssistant::reply`]
    pub fn respond(&self, message: &str) -> ChatReply {
        let text = message.to_lowercase();
        let slots = heuristics::extract_slots(&text);

        let reply = if heuristics::mentions_service(&text) && heuristics::mentions_date(&text) {
            ASK_DETAILS
        } else if slots.seller.is_some() {
            ASK_AMOUNT
        } else {
            GREETING
        };

        ChatReply::booking(reply, slots)
    }
}

#[async_trait]
impl BookingAssistant for DeterministicAssistant {
    fn name(&self) -> &'static str {
        "Deterministic"
    }

    fn mode(&self) -> AssistantMode {
        AssistantMode::Mock
    }

    async fn reply(&self, message: &str) -> Result<ChatReply> {
        Ok(self.respond(message))
    }
}

// ============================================================================
// OpenAI Assistant (live mode)
// ============================================================================

/// Configuration for the OpenAI assistant
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        }
    }

    /// `None` when `OPENAI_API_KEY` is unset
    pub fn from_env() -> Option<Self> {
        let mut config = Self::new(std::env::var("OPENAI_API_KEY").ok()?);
        if let Ok(model) = std::env::var("ESCROWDESK_OPENAI_MODEL") {
            config.model = model;
        }
        if let Ok(url) = std::env::var("ESCROWDESK_OPENAI_BASE_URL") {
            config.base_url = url;
        }
        Some(config)
    }
}

/// Chat-completions backed assistant
pub struct OpenAIAssistant {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIAssistant {
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        Some(Self::new(OpenAIConfig::from_env()?))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, message: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::NetworkError {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::RequestFailed {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| AssistantError::InvalidResponse {
                    message: e.to_string(),
                })?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl BookingAssistant for OpenAIAssistant {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn mode(&self) -> AssistantMode {
        AssistantMode::Live
    }

    async fn reply(&self, message: &str) -> Result<ChatReply> {
        let content = self.complete(message).await?;
        let reply = match content.trim() {
            "" => GREETING.to_string(),
            text => text.to_string(),
        };
        // Slots come from the user's own words, not the model's.
        Ok(ChatReply::booking(reply, heuristics::extract_slots(message)))
    }
}
