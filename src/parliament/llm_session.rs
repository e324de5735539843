//! The `llm_session` module manages one agent's conversation with an LLM: the system
//! prompt, the rolling history, and the token usage reported by the client.
//!
//! The session prunes the oldest messages when the reported usage exceeds `max_tokens`.

use std::sync::Arc;

use crate::parliament::client_wrapper::{ClientWrapper, Message, Role, SendError, TokenUsage};

/// A conversation session with an LLM.
///
/// - `client`: the `ClientWrapper` the session talks through.
/// - `system_prompt`: the context-steering system message, sent first on every call.
/// - `conversation_history`: user and assistant messages, system prompt excluded.
/// - `max_tokens`: context budget that triggers trimming.
pub struct LLMSession {
    client: Arc<dyn ClientWrapper>,
    system_prompt: Message,
    conversation_history: Vec<Message>,
    max_tokens: usize,
    last_usage: TokenUsage,
}

impl LLMSession {
    pub fn new(client: Arc<dyn ClientWrapper>, system_prompt: String, max_tokens: usize) -> Self {
        LLMSession {
            client,
            system_prompt: Message::new(Role::System, system_prompt),
            conversation_history: Vec::new(),
            max_tokens,
            last_usage: TokenUsage::default(),
        }
    }

    /// Appends the message, sends system prompt + history, appends the reply and returns it.
    pub async fn send_message(&mut self, role: Role, content: String) -> Result<Message, SendError> {
        self.conversation_history.push(Message::new(role, content));
        match self.complete().await {
            Ok(response) => Ok(response),
            Err(err) => {
                // keep history consistent with what the model has actually answered
                self.conversation_history.pop();
                Err(err)
            }
        }
    }

    /// Sends system prompt + current history as-is, appends the reply and returns it.
    ///
    /// When the client reports usage above `max_tokens`, the oldest messages are dropped
    /// until roughly the excess has been cleared.
    pub async fn complete(&mut self) -> Result<Message, SendError> {
        let mut request = Vec::with_capacity(self.conversation_history.len() + 1);
        request.push(self.system_prompt.clone());
        request.extend(self.conversation_history.iter().cloned());

        let response = self.client.send_message(&request).await?;

        let usage = self.client.get_last_usage().await.unwrap_or_default();
        if usage.total_tokens > self.max_tokens {
            let mut excess = usage.total_tokens - self.max_tokens;
            while excess > 0 && !self.conversation_history.is_empty() {
                let msg = self.conversation_history.remove(0);
                excess = excess.saturating_sub(estimate_message_token_count(&msg));
            }
        }
        self.last_usage = usage;

        self.conversation_history.push(response.clone());
        Ok(response)
    }

    /// Add a message to the history without calling the LLM.
    pub fn inject_message(&mut self, role: Role, content: String) {
        self.conversation_history.push(Message::new(role, content));
    }

    pub fn set_system_prompt(&mut self, prompt: String) {
        self.system_prompt = Message::new(Role::System, prompt);
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt.content
    }

    pub fn get_conversation_history(&self) -> &[Message] {
        &self.conversation_history
    }

    /// Usage reported by the most recent call.
    pub fn token_usage(&self) -> &TokenUsage {
        &self.last_usage
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        &self.client
    }
}

/// One token per 4 characters, at least one.
fn estimate_token_count(text: &str) -> usize {
    (text.len() / 4).max(1)
}

/// Content estimate plus one token for the role annotation.
fn estimate_message_token_count(message: &Message) -> usize {
    1 + estimate_token_count(&message.content)
}
