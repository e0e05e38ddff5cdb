//! Assistant Router - picks the assistant and absorbs its failures

use std::sync::Arc;

use crate::providers::*;
use crate::types::*;

/// Selects an assistant by mode and never lets a chat request fail
#[derive(Clone)]
pub struct AssistantRouter {
    assistant: Arc<dyn BookingAssistant>,
}

impl AssistantRouter {
    /// Use a specific assistant
    pub fn new(assistant: Arc<dyn BookingAssistant>) -> Self {
        Self { assistant }
    }

    /// Keyword heuristics only
    pub fn deterministic() -> Self {
        Self::new(Arc::new(DeterministicAssistant::new()))
    }

    /// Build from `USE_AI` and `OPENAI_API_KEY`
    pub fn from_env() -> Self {
        Self::from_mode(AssistantMode::from_env())
    }

    /// Build for a mode, reading credentials from the environment
    pub fn from_mode(mode: AssistantMode) -> Self {
        match mode {
            AssistantMode::Mock => Self::deterministic(),
            AssistantMode::Live => match OpenAIAssistant::from_env() {
                Some(assistant) => {
                    tracing::info!(model = assistant.model(), "Using OpenAI booking assistant");
                    Self::new(Arc::new(assistant))
                }
                None => {
                    tracing::warn!("OPENAI_API_KEY not set, using deterministic assistant");
                    Self::deterministic()
                }
            },
        }
    }

    /// Mode of the assistant actually in use
    pub fn mode(&self) -> AssistantMode {
        self.assistant.mode()
    }

    pub fn name(&self) -> &'static str {
        self.assistant.name()
    }

    /// Answer a message; failures degrade to the greeting
    pub async fn reply(&self, message: &str) -> ChatReply {
        match self.assistant.reply(message).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    assistant = self.assistant.name(),
                    code = e.error_code(),
                    "Assistant failed: {}, replying with greeting",
                    e
                );
                ChatReply::greeting()
            }
        }
    }
}

impl Default for AssistantRouter {
    fn default() -> Self {
        Self::deterministic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Broken;

    #[async_trait]
    impl BookingAssistant for Broken {
        fn name(&self) -> &'static str {
            "Broken"
        }

        fn mode(&self) -> AssistantMode {
            AssistantMode::Live
        }

        async fn reply(&self, _message: &str) -> Result<ChatReply> {
            Err(AssistantError::RequestFailed {
                message: "HTTP 500".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_greeting() {
        let router = AssistantRouter::new(Arc::new(Broken));
        assert_eq!(router.reply("haircut tomorrow").await, ChatReply::greeting());
    }

    #[tokio::test]
    async fn test_mock_mode_is_deterministic() {
        let router = AssistantRouter::from_mode(AssistantMode::Mock);
        assert_eq!(router.mode(), AssistantMode::Mock);
        let reply = router.reply("haircut tomorrow").await;
        assert_eq!(reply.reply, ASK_DETAILS);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("LIVE".parse::<AssistantMode>().unwrap(), AssistantMode::Live);
        assert_eq!(" mock ".parse::<AssistantMode>().unwrap(), AssistantMode::Mock);
        assert!("auto".parse::<AssistantMode>().is_err());
    }
}
