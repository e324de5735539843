//! Azure OpenAI client wrapper.
//!
//! Azure routes chat completions per deployment and authenticates with an `api-key` header
//! instead of a bearer token, so this wrapper speaks to the REST endpoint directly with the
//! shared `reqwest` client rather than going through `openai_rust2`.
//!
//! ```text
//! POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={version}
//! api-key: <AZURE_API_KEY>
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::parliament::client_wrapper::{
    ClientWrapper, Message, ModelFamily, ModelInfo, Role, SendError, TokenUsage,
};
use crate::parliament::clients::common::get_shared_http_client;

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

/// `message` of an Azure error body (`{"error": {"code": .., "message": ..}}`), if present.
pub fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Client wrapper for a single Azure OpenAI deployment.
pub struct AzureOpenAIClient {
    api_key: String,
    endpoint: String,
    api_version: String,
    deployment: String,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl AzureOpenAIClient {
    pub fn new(api_key: &str, endpoint: &str, api_version: &str, deployment: &str) -> Self {
        AzureOpenAIClient {
            api_key: api_key.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            deployment: deployment.to_string(),
            token_usage: Mutex::new(None),
        }
    }

    /// Full URL chat completions are posted to.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl ClientWrapper for AzureOpenAIClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
        let body = ChatRequest {
            messages: messages
                .iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str(),
                    content: &msg.content,
                })
                .collect(),
        };

        let response = get_shared_http_client()
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::error!(
                "AzureOpenAIClient::send_message(...): deployment {} returned {}: {}",
                self.deployment,
                status,
                text
            );
            return Err(match error_message(&text) {
                Some(message) => format!(
                    "Azure OpenAI request failed with status {}: {}",
                    status, message
                ),
                None => format!("Azure OpenAI request failed with status {}", status),
            }
            .into());
        }

        let parsed: ChatResponse = response.json().await?;

        *self.token_usage.lock().await = parsed.usage.map(|usage| TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or("Azure OpenAI response contained no message content")?;

        Ok(Message::new(Role::Assistant, content))
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::text_chat(ModelFamily::Unknown)
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
