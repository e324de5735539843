//! Agent System
//!
//! An [`Agent`] is one seat in the parliament: a display name, a description the moderator
//! reads when picking speakers, a system message taken from the persona, and its own
//! [`LLMSession`] over the client handle it owns for the duration of a session.
//!
//! # Example
//!
//! ```rust,no_run
//! use parliament::Agent;
//! use parliament::clients::openai::OpenAIClient;
//! use std::sync::Arc;
//!
//! let agent = Agent::new(
//!     "Shauli",
//!     Arc::new(OpenAIClient::new_with_model_string("key", "gpt-4")),
//! )
//! .with_system_message("You are Shauli, the group leader.")
//! .with_description("Group leader, humorous, self-centered facilitator.");
//! ```

use std::sync::Arc;

use crate::parliament::client_wrapper::{ClientWrapper, Message, Role, SendError, TokenUsage};
use crate::parliament::llm_session::LLMSession;

/// Context budget given to every agent session.
pub const DEFAULT_MAX_TOKENS: usize = 128_000;

/// Response body returned after asking an agent to speak.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub content: String,
    pub tokens_used: Option<TokenUsage>,
}

pub struct Agent {
    /// Display name; also the `source` of every message the agent produces.
    pub name: String,
    /// What the agent is like, as shown to the moderator.
    pub description: String,
    session: LLMSession,
}

impl Agent {
    /// Create an agent with an empty system message.
    pub fn new(name: impl Into<String>, client: Arc<dyn ClientWrapper>) -> Self {
        Agent {
            name: name.into(),
            description: String::new(),
            session: LLMSession::new(client, String::new(), DEFAULT_MAX_TOKENS),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.session.set_system_prompt(system_message.into());
        self
    }

    pub fn system_message(&self) -> &str {
        self.session.system_prompt()
    }

    pub fn client(&self) -> &Arc<dyn ClientWrapper> {
        self.session.client()
    }

    /// Put a message into the agent's history without a model call.
    ///
    /// The group chat routes what other speakers said through here before the agent's turn.
    pub fn receive_message(&mut self, role: Role, content: String) {
        self.session.inject_message(role, content);
    }

    pub fn session_history_len(&self) -> usize {
        self.session.get_conversation_history().len()
    }

    /// Send a message through the agent's own session and return its reply.
    pub async fn send(&mut self, message: &str) -> Result<AgentResponse, SendError> {
        log::debug!("Agent {} is answering a direct message", self.name);
        let reply = self
            .session
            .send_message(Role::User, message.to_string())
            .await?;
        Ok(self.to_response(&reply))
    }

    /// Reply to whatever has been routed in so far, without adding a new prompt.
    pub async fn respond(&mut self) -> Result<AgentResponse, SendError> {
        log::debug!("Agent {} is taking a turn", self.name);
        let reply = self.session.complete().await?;
        Ok(self.to_response(&reply))
    }

    fn to_response(&self, reply: &Message) -> AgentResponse {
        let usage = self.session.token_usage();
        AgentResponse {
            content: reply.content.to_string(),
            tokens_used: if usage.total_tokens > 0 {
                Some(usage.clone())
            } else {
                None
            },
        }
    }
}
