use crate::parliament::client_wrapper::{
    ClientWrapper, Message, ModelInfo, SendError, TokenUsage,
};
use crate::parliament::clients::openai::OpenAIClient;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Sampling temperature the Grok members speak with.
pub const GROK_TEMPERATURE: f32 = 0.7;

/// Grok deployment reached through an OpenAI compatible endpoint.
///
/// The bearer token is whatever key the caller hands in; the factory passes the Azure key
/// because the parliament's Grok deployment is hosted behind the same Azure resource.
pub struct GrokClient {
    client: OpenAIClient,
    model: String,
}

impl GrokClient {
    pub fn new(secret_key: &str, deployment_name: &str, endpoint: &str) -> Self {
        GrokClient {
            client: OpenAIClient::new_with_base_url(secret_key, deployment_name, endpoint)
                .with_temperature(GROK_TEMPERATURE),
            model: deployment_name.to_string(),
        }
    }

    pub fn temperature(&self) -> Option<f32> {
        self.client.temperature()
    }
}

#[async_trait]
impl ClientWrapper for GrokClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
        self.client.send_message(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn model_info(&self) -> ModelInfo {
        self.client.model_info()
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        self.client.usage_slot()
    }
}
