use crate::parliament::client_wrapper::{Message, SendError, TokenUsage};
use lazy_static::lazy_static;
use openai_rust::chat;
use openai_rust2 as openai_rust;
use std::time::Duration;
use tokio::sync::Mutex;

lazy_static! {
    /// One pooled HTTP client shared by every provider wrapper.
    ///
    /// Idle connections are kept for 90 seconds with TCP keepalive, so consecutive turns of
    /// a group chat reuse the same TLS session instead of reconnecting.
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|err| {
            log::warn!(
                "parliament::clients::common: falling back to a default HTTP client: {}",
                err
            );
            reqwest::Client::new()
        });
}

/// Borrow the process-wide pooled HTTP client.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Convert our messages into the shape `openai_rust2` serializes.
pub fn to_chat_messages(messages: &[Message]) -> Vec<chat::Message> {
    messages
        .iter()
        .map(|msg| chat::Message {
            role: msg.role.as_str().to_owned(),
            content: msg.content.to_string(),
        })
        .collect()
}

/// Send a chat request, record its usage, and return the assistant's content.
pub async fn send_and_track(
    api: &openai_rust::Client,
    model: &str,
    temperature: Option<f32>,
    formatted_msgs: Vec<chat::Message>,
    url_path: Option<String>,
    usage_slot: &Mutex<Option<TokenUsage>>,
) -> Result<String, SendError> {
    let mut chat_arguments = chat::ChatArguments::new(model, formatted_msgs);
    chat_arguments.temperature = temperature;

    let response = match api.create_chat(chat_arguments, url_path).await {
        Ok(response) => response,
        Err(err) => {
            log::error!(
                "parliament::clients::common::send_and_track(...): API Error: {}",
                err
            );
            return Err(err.to_string().into());
        }
    };

    let usage = TokenUsage {
        input_tokens: response.usage.prompt_tokens as usize,
        output_tokens: response.usage.completion_tokens as usize,
        total_tokens: response.usage.total_tokens as usize,
    };
    *usage_slot.lock().await = Some(usage);

    response
        .choices
        .first()
        .map(|choice| choice.message.content.clone())
        .ok_or_else(|| "chat completion returned no choices".into())
}
