//! A ClientWrapper is a wrapper around a specific cloud LLM service.
//! It provides a common interface to interact with the LLMs.
//! It does not keep track of the conversation, for that we use an LLMSession
//! which keeps the history and uses a ClientWrapper to talk to the LLM.

use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Represents the possible roles for a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    // set by the developer to steer the model's responses
    System,
    // a message sent by a human user, or another agent routed in as input
    User,
    // lets the model know the content was generated as a response to a user message
    Assistant,
}

impl Role {
    /// Wire name used by every OpenAI-compatible chat endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: Arc<str>,
}

impl Message {
    pub fn new(role: Role, content: impl AsRef<str>) -> Self {
        Message {
            role,
            content: Arc::from(content.as_ref()),
        }
    }
}

/// Model family reported alongside a client's capability flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelFamily {
    OpenAI,
    Unknown,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::OpenAI => write!(f, "openai"),
            ModelFamily::Unknown => write!(f, "unknown"),
        }
    }
}

/// Capability tags attached to every client handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub vision: bool,
    pub function_calling: bool,
    pub json_output: bool,
    pub structured_output: bool,
    pub family: ModelFamily,
}

impl ModelInfo {
    /// The flags every provider in the parliament is configured with: text only, with
    /// function calling and JSON/structured output enabled.
    pub fn text_chat(family: ModelFamily) -> Self {
        ModelInfo {
            vision: false,
            function_calling: true,
            json_output: true,
            structured_output: true,
            family,
        }
    }
}

/// Type alias for a Send-able error box
pub type SendError = Box<dyn Error + Send + Sync>;

/// Trait defining the interface to interact with various LLM services.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a message to the LLM and get a response.
    /// - `messages`: The messages to send in the request, system prompt first.
    async fn send_message(&self, messages: &[Message]) -> Result<Message, SendError>;

    /// Model or deployment name requests are routed to.
    fn model_name(&self) -> &str;

    /// Capability flags for this handle.
    fn model_info(&self) -> ModelInfo {
        ModelInfo::text_chat(ModelFamily::Unknown)
    }

    /// Hook to retrieve usage from the *last* send_message() call.
    /// Default impl reads `usage_slot()` so wrappers only need to expose the slot.
    async fn get_last_usage(&self) -> Option<TokenUsage> {
        match self.usage_slot() {
            Some(slot) => slot.lock().await.clone(),
            None => None,
        }
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        // Implementations that track TokenUsage override this to return their slot.
        None
    }
}
