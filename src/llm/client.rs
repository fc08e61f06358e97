use serde_json::Value;
use tracing::{debug, warn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ToolDefinition};
use crate::{
    config::Settings,
    error::{HrError, Result},
    http::{HttpClient, build_client},
};

#[derive(Clone)]
pub struct ChatClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(
        client: HttpClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// # Errors
    /// `MissingConfig` when no API key is set.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .openai_api_key
            .clone()
            .ok_or_else(|| HrError::MissingConfig("OPENAI_API_KEY must be set".to_string()))?;
        Ok(Self::new(
            build_client(settings.request_timeout)?,
            settings.openai_base_url.clone(),
            api_key,
            settings.openai_model.clone(),
        ))
    }

    /// Sends the conversation and returns the model's next message.
    pub async fn complete(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools: (!tools.is_empty()).then_some(tools),
            tool_choice: (!tools.is_empty()).then_some("auto"),
        };
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "chat completion failed");
            return Err(HrError::Llm(format!("{status}: {body}")));
        }

        let body: Value = response.json().await?;
        let parsed: ChatCompletionResponse = serde_json::from_value(body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| {
                debug!(finish_reason = ?choice.finish_reason, "chat completion received");
                choice.message
            })
            .ok_or_else(|| HrError::Llm("No choices in chat completion response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    fn client(base: &str) -> ChatClient {
        ChatClient::new(build_client(Duration::from_secs(5)).unwrap(), base, "sk-test", "gpt-4o")
    }

    #[tokio::test]
    async fn posts_conversation_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {"role": "assistant", "content": "Hello!"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server.uri())
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content.as_deref(), Some("Hello!"));
    }

    #[tokio::test]
    async fn upstream_error_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .complete(&[ChatMessage::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(matches!(&err, HrError::Llm(msg) if msg.contains("rate limited")));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            ChatClient::from_settings(&settings),
            Err(HrError::MissingConfig(_))
        ));
    }
}
