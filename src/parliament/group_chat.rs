//! Selector group chat.
//!
//! A moderator-driven conversation between [`Agent`]s. Before every turn the moderator's
//! client is shown the roles, the conversation so far and the moderator's own instructions,
//! and asked which participant should speak next. The chosen agent receives everything it
//! has not seen yet and replies. The chat stops when its [`TerminationCondition`] holds.
//!
//! ```text
//! task (source "user")
//!   └─ loop until termination
//!        ├─ moderator: "who speaks next?"  -> participant name
//!        ├─ route unseen messages to that participant
//!        └─ participant replies            -> appended to the transcript
//! ```
//!
//! Turns are strictly sequential; a [`CancellationToken`] is checked before each turn and
//! raced against every provider call. Provider failures end the run; there is no retry.
//!
//! # Example
//!
//! ```rust,no_run
//! use parliament::group_chat::{SelectorGroupChat, TerminationCondition};
//! use parliament::clients::openai::OpenAIClient;
//! use parliament::Agent;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async {
//! let client = || Arc::new(OpenAIClient::new_with_model_string("key", "gpt-4"));
//! let mut chat = SelectorGroupChat::new("ParliamentChat", client())
//!     .with_selector_prompt("You pick the funniest next speaker.")
//!     .with_termination(TerminationCondition::MaxMessages(5));
//! chat.add_participant(Agent::new("Shauli", client())).unwrap();
//! chat.add_participant(Agent::new("Avi", client())).unwrap();
//!
//! let result = chat.run("Discuss the weather.", CancellationToken::new()).await.unwrap();
//! for msg in &result.messages {
//!     println!("{}: {}", msg.source, msg.content);
//! }
//! # };
//! ```

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::parliament::agent::Agent;
use crate::parliament::client_wrapper::{ClientWrapper, Message, Role};

/// Source tag of the task message that opens every run.
pub const USER_SOURCE: &str = "user";

/// One message produced during a run, in emission order.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Agent name, or [`USER_SOURCE`] for the task.
    pub source: String,
    pub content: Arc<str>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(source: impl Into<String>, content: impl AsRef<str>) -> Self {
        ChatMessage {
            source: source.into(),
            content: Arc::from(content.as_ref()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.source == USER_SOURCE
    }
}

/// When a run stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationCondition {
    /// Stop once this many messages exist, the task message included.
    MaxMessages(usize),
}

impl TerminationCondition {
    /// Returns the stop reason when the condition holds.
    pub fn check(&self, messages: &[ChatMessage]) -> Option<String> {
        match self {
            TerminationCondition::MaxMessages(max) if messages.len() >= *max => Some(format!(
                "Maximum number of messages {} reached, current message count: {}",
                max,
                messages.len()
            )),
            TerminationCondition::MaxMessages(_) => None,
        }
    }
}

/// Outcome of [`SelectorGroupChat::run`].
#[derive(Debug)]
pub struct TaskResult {
    /// Every message of the run in emission order, task message first.
    pub messages: Vec<ChatMessage>,
    pub stop_reason: String,
    /// Tokens reported by the moderator and the speakers. Zero for clients without usage.
    pub total_tokens_used: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChatError {
    /// `run` was called with no participants.
    NoParticipants,
    /// Two participants share a name; names are how the moderator addresses speakers.
    DuplicateParticipant(String),
    Cancelled,
    /// A moderator or participant call failed.
    Provider(String),
}

impl fmt::Display for GroupChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupChatError::NoParticipants => write!(f, "No participants in group chat"),
            GroupChatError::DuplicateParticipant(name) => {
                write!(f, "Participant '{}' already exists", name)
            }
            GroupChatError::Cancelled => write!(f, "Group chat was cancelled"),
            GroupChatError::Provider(msg) => write!(f, "Provider call failed: {}", msg),
        }
    }
}

impl Error for GroupChatError {}

pub struct SelectorGroupChat {
    /// Per-instance id, used to correlate log lines.
    pub id: String,
    pub name: String,
    pub description: String,
    selector_prompt: String,
    moderator: Arc<dyn ClientWrapper>,
    participants: Vec<Agent>,
    /// Index into the run's messages up to which each participant is caught up.
    cursors: Vec<usize>,
    termination: TerminationCondition,
    allow_repeated_speaker: bool,
}

impl SelectorGroupChat {
    /// Defaults: generic selector prompt, stop after 10 messages, no repeated speakers.
    pub fn new(name: impl Into<String>, moderator: Arc<dyn ClientWrapper>) -> Self {
        SelectorGroupChat {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            selector_prompt: String::from(
                "You are in a role play game. Select the next participant to speak.",
            ),
            moderator,
            participants: Vec::new(),
            cursors: Vec::new(),
            termination: TerminationCondition::MaxMessages(10),
            allow_repeated_speaker: false,
        }
    }

    /// System prompt the moderator selects speakers under.
    pub fn with_selector_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.selector_prompt = prompt.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_termination(mut self, termination: TerminationCondition) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_allow_repeated_speaker(mut self, allow: bool) -> Self {
        self.allow_repeated_speaker = allow;
        self
    }

    /// Register a participant. Names must be unique.
    pub fn add_participant(&mut self, agent: Agent) -> Result<(), GroupChatError> {
        if self.participants.iter().any(|a| a.name == agent.name) {
            return Err(GroupChatError::DuplicateParticipant(agent.name));
        }
        self.participants.push(agent);
        self.cursors.push(0);
        Ok(())
    }

    pub fn participants(&self) -> &[Agent] {
        &self.participants
    }

    pub fn selector_prompt(&self) -> &str {
        &self.selector_prompt
    }

    pub fn termination(&self) -> &TerminationCondition {
        &self.termination
    }

    pub fn allow_repeated_speaker(&self) -> bool {
        self.allow_repeated_speaker
    }

    /// Run the conversation on `task` until the termination condition holds.
    pub async fn run(
        &mut self,
        task: &str,
        cancellation: CancellationToken,
    ) -> Result<TaskResult, GroupChatError> {
        if self.participants.is_empty() {
            return Err(GroupChatError::NoParticipants);
        }
        log::info!(
            "[{} {}] starting with {} participants",
            self.name,
            self.id,
            self.participants.len()
        );

        for cursor in self.cursors.iter_mut() {
            *cursor = 0;
        }
        let mut messages = vec![ChatMessage::new(USER_SOURCE, task)];
        let mut previous_speaker: Option<usize> = None;
        let mut total_tokens = 0;

        let stop_reason = loop {
            if let Some(reason) = self.termination.check(&messages) {
                break reason;
            }
            if cancellation.is_cancelled() {
                return Err(GroupChatError::Cancelled);
            }

            let eligible = self.eligible_speakers(previous_speaker);
            let speaker = if eligible.len() == 1 {
                eligible[0]
            } else {
                let (selected, tokens) = self
                    .select_speaker(&messages, &eligible, &cancellation)
                    .await?;
                total_tokens += tokens;
                selected
            };

            let cursor = self.cursors[speaker];
            let outcome = {
                let agent = &mut self.participants[speaker];
                for msg in &messages[cursor..] {
                    if msg.source == agent.name {
                        continue;
                    }
                    agent.receive_message(Role::User, format!("{}: {}", msg.source, msg.content));
                }
                tokio::select! {
                    _ = cancellation.cancelled() => None,
                    result = agent.respond() => Some(result),
                }
            };
            let speaker_name = self.participants[speaker].name.clone();
            let response = match outcome {
                None => return Err(GroupChatError::Cancelled),
                Some(Ok(response)) => response,
                Some(Err(err)) => {
                    log::error!("[{}] {} failed to respond: {}", self.name, speaker_name, err);
                    return Err(GroupChatError::Provider(err.to_string()));
                }
            };
            if let Some(usage) = &response.tokens_used {
                total_tokens += usage.total_tokens;
            }

            log::info!("[{}] {} spoke", self.name, speaker_name);
            messages.push(ChatMessage::new(speaker_name, &response.content));
            self.cursors[speaker] = messages.len();
            previous_speaker = Some(speaker);
        };

        log::info!("[{}] stopped: {}", self.name, stop_reason);
        Ok(TaskResult {
            messages,
            stop_reason,
            total_tokens_used: total_tokens,
        })
    }

    fn eligible_speakers(&self, previous: Option<usize>) -> Vec<usize> {
        let all = 0..self.participants.len();
        match previous {
            Some(prev) if !self.allow_repeated_speaker && self.participants.len() > 1 => {
                all.filter(|&i| i != prev).collect()
            }
            _ => all.collect(),
        }
    }

    /// Ask the moderator which of `eligible` speaks next.
    ///
    /// Falls back to the first eligible participant when the reply names nobody.
    async fn select_speaker(
        &self,
        messages: &[ChatMessage],
        eligible: &[usize],
        cancellation: &CancellationToken,
    ) -> Result<(usize, usize), GroupChatError> {
        let request = [
            Message::new(Role::System, &self.selector_prompt),
            Message::new(Role::User, self.selection_prompt(messages, eligible)),
        ];

        let outcome = tokio::select! {
            _ = cancellation.cancelled() => None,
            result = self.moderator.send_message(&request) => Some(result),
        };
        let reply = match outcome {
            None => return Err(GroupChatError::Cancelled),
            Some(Ok(reply)) => reply,
            Some(Err(err)) => {
                log::error!("[{}] moderator failed to select a speaker: {}", self.name, err);
                return Err(GroupChatError::Provider(err.to_string()));
            }
        };
        let tokens = self
            .moderator
            .get_last_usage()
            .await
            .map(|usage| usage.total_tokens)
            .unwrap_or(0);

        let names: Vec<&str> = eligible
            .iter()
            .map(|&i| self.participants[i].name.as_str())
            .collect();
        let selected = match match_participant(&reply.content, &names) {
            Some(pos) => eligible[pos],
            None => {
                log::warn!(
                    "[{}] moderator reply '{}' names no eligible participant, defaulting to {}",
                    self.name,
                    reply.content.trim(),
                    names[0]
                );
                eligible[0]
            }
        };
        Ok((selected, tokens))
    }

    fn selection_prompt(&self, messages: &[ChatMessage], eligible: &[usize]) -> String {
        let roles: Vec<String> = eligible
            .iter()
            .map(|&i| {
                let agent = &self.participants[i];
                format!("{}: {}", agent.name, agent.description)
            })
            .collect();
        let names: Vec<&str> = eligible
            .iter()
            .map(|&i| self.participants[i].name.as_str())
            .collect();
        let history: Vec<String> = messages
            .iter()
            .map(|msg| format!("{}: {}", msg.source, msg.content))
            .collect();

        format!(
            "The following roles are available:\n{}\n\nConversation so far:\n{}\n\n\
             Read the above conversation. Then select the next role from [{}] to play. \
             Only return the role.",
            roles.join("\n"),
            history.join("\n"),
            names.join(", ")
        )
    }
}

/// Position in `names` of the participant a moderator reply refers to.
///
/// An exact (trimmed, case-insensitive) match wins; otherwise the earliest name mentioned
/// in the reply.
pub fn match_participant(reply: &str, names: &[&str]) -> Option<usize> {
    let reply = reply.trim().to_lowercase();
    if let Some(pos) = names.iter().position(|n| n.to_lowercase() == reply) {
        return Some(pos);
    }
    names
        .iter()
        .enumerate()
        .filter_map(|(pos, n)| reply.find(&n.to_lowercase()).map(|at| (at, pos)))
        .min()
        .map(|(_, pos)| pos)
}
