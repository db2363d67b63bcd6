//! Azure OpenAI chat-completions client.
//!
//! Calls the deployment-scoped REST endpoint
//! (`{endpoint}/openai/deployments/{deployment}/chat/completions`) with
//! `api-key` header auth. No streaming — the dialogue engine wants whole
//! utterances, one request per turn, single attempt.

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::provider::{CompletionProvider, LlmError, LlmResult};
use crate::types::{ChatMessage, CompletionOptions, Role};

/// Request body for the chat-completions endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
}

/// One message as the API expects it.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Azure OpenAI completion provider.
pub struct AzureOpenAiProvider {
    /// HTTP client (reused across requests).
    client: reqwest::Client,
    /// Resource endpoint without trailing slash.
    endpoint: String,
    /// API key sent in the `api-key` header.
    api_key: String,
    /// Deployment name of the chat model.
    deployment: String,
    /// REST API version query parameter.
    api_version: String,
}

impl AzureOpenAiProvider {
    /// Create a new provider.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_owned();
        let deployment = deployment.into();
        info!(endpoint = %endpoint, deployment = %deployment, "Azure OpenAI provider initialized");
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.into(),
            deployment,
            api_version: api_version.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }

    fn wire_role(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
    ) -> LlmResult<String> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
        for msg in history {
            messages.push(WireMessage {
                role: Self::wire_role(msg.role),
                content: &msg.content,
            });
        }

        let body = ChatCompletionsRequest {
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
        };

        debug!(
            history_len = history.len(),
            temperature = options.temperature,
            "requesting completion"
        );

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let parsed: ChatCompletionsResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AzureOpenAiProvider {
        AzureOpenAiProvider::new(server.uri(), "test-key", "gpt-4o-mini", "2024-02-01")
    }

    fn completion_json(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        })
    }

    #[tokio::test]
    async fn sends_deployment_scoped_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o-mini/chat/completions"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_json("hi there")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let text = provider
            .complete("be brief", &[], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn assembles_system_and_history_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "their turn"},
                    {"role": "assistant", "content": "my turn"}
                ],
                "temperature": 0.9,
                "max_tokens": 250
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_json("ok")))
            .expect(1)
            .mount(&server)
            .await;

        let history = vec![
            ChatMessage::user("their turn"),
            ChatMessage::assistant("my turn"),
        ];
        let options = CompletionOptions {
            temperature: 0.9,
            ..CompletionOptions::default()
        };
        let provider = provider_for(&server);
        let text = provider.complete("persona", &history, &options).await.unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete("p", &[], &CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_content_is_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete("p", &[], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyCompletion));
    }

    #[tokio::test]
    async fn missing_choices_is_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let err = provider
            .complete("p", &[], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyCompletion));
    }

    #[test]
    fn trailing_slash_stripped_from_endpoint() {
        let provider = AzureOpenAiProvider::new(
            "https://example.openai.azure.com/",
            "k",
            "gpt-4o-mini",
            "2024-02-01",
        );
        assert_eq!(
            provider.completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-02-01"
        );
    }
}
