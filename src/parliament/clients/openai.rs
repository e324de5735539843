//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API
//! and for any endpoint that speaks the same protocol under a different base URL.
//!
//! Every call stores the latest `TokenUsage` so `LLMSession` can trim its history once the
//! conversation outgrows the configured budget.
//!
//! # Example
//!
//! ```rust,no_run
//! use parliament::clients::openai::OpenAIClient;
//! use parliament::client_wrapper::{ClientWrapper, Message, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let secret_key = std::env::var("OPENAI_API_KEY")?;
//!     let client = OpenAIClient::new_with_model_string(&secret_key, "gpt-4");
//!
//!     let resp = client
//!         .send_message(&[
//!             Message::new(Role::System, "You are a parliament member."),
//!             Message::new(Role::User, "Hello!"),
//!         ])
//!         .await?;
//!     println!("Assistant: {}", resp.content);
//!     Ok(())
//! }
//! ```
use async_trait::async_trait;
use openai_rust2 as openai_rust;
use tokio::sync::Mutex;

use crate::parliament::client_wrapper::{
    ClientWrapper, Message, ModelFamily, ModelInfo, Role, SendError, TokenUsage,
};
use crate::parliament::clients::common::{
    get_shared_http_client, send_and_track, to_chat_messages,
};

/// Model used by the OpenAI provider of the parliament.
pub const DEFAULT_MODEL: &str = "gpt-4";

const DEFAULT_URL_PATH: &str = "/v1/chat/completions";

/// Client wrapper for OpenAI's Chat Completions API.
///
/// Holds the model identifier, an optional sampling temperature and the slot for the
/// usage reported by the most recent request.
pub struct OpenAIClient {
    client: openai_rust::Client,
    model: String,
    url_path: String,
    temperature: Option<f32>,
    family: ModelFamily,
    token_usage: Mutex<Option<TokenUsage>>,
}

impl OpenAIClient {
    /// Construct a client against api.openai.com for an explicit model name.
    pub fn new_with_model_string(secret_key: &str, model_name: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client(
                secret_key,
                get_shared_http_client().clone(),
            ),
            model: model_name.to_string(),
            url_path: DEFAULT_URL_PATH.to_string(),
            temperature: None,
            family: ModelFamily::OpenAI,
            token_usage: Mutex::new(None),
        }
    }

    /// Construct a client targeting a custom OpenAI compatible base URL.
    ///
    /// Requests go to `<base path>/chat/completions`, the same layout every OpenAI
    /// compatible gateway uses, so a base of `https://host/openai/v1` is respected.
    pub fn new_with_base_url(secret_key: &str, model_name: &str, base_url: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                get_shared_http_client().clone(),
                base_url,
            ),
            model: model_name.to_string(),
            url_path: completions_path(base_url),
            temperature: None,
            family: ModelFamily::Unknown,
            token_usage: Mutex::new(None),
        }
    }

    /// Set the sampling temperature sent with every request (builder pattern).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }
}

/// Derive the chat completions path from a base URL.
///
/// `https://api.x.ai/v1` becomes `/v1/chat/completions`; a base with no path maps to the
/// OpenAI default.
pub fn completions_path(base_url: &str) -> String {
    let path = match reqwest::Url::parse(base_url) {
        Ok(url) => url.path().trim_end_matches('/').to_string(),
        Err(_) => String::new(),
    };
    if path.is_empty() {
        DEFAULT_URL_PATH.to_string()
    } else {
        format!("{}/chat/completions", path)
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError> {
        let content = send_and_track(
            &self.client,
            &self.model,
            self.temperature,
            to_chat_messages(messages),
            Some(self.url_path.clone()),
            &self.token_usage,
        )
        .await
        .map_err(|err| {
            log::error!(
                "OpenAIClient::send_message(...): request to model {} failed: {}",
                self.model,
                err
            );
            err
        })?;

        Ok(Message::new(Role::Assistant, content))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::text_chat(self.family.clone())
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.token_usage)
    }
}
