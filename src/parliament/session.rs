//! Session assembly.
//!
//! Binds personas to client handles: one [`Agent`] per seated member on a provider picked by
//! a [`ProviderSelector`], plus the moderator on a fixed provider. Members whose provider is
//! unavailable are skipped; a missing moderator client aborts the session before any
//! network call.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::parliament::agent::Agent;
use crate::parliament::client_wrapper::ClientWrapper;
use crate::parliament::factory::{ClientFactory, Provider};
use crate::parliament::group_chat::{
    ChatMessage, GroupChatError, SelectorGroupChat, TaskResult, TerminationCondition,
    USER_SOURCE,
};
use crate::parliament::persona::{PersonaCatalog, PersonaRecord};
use crate::parliament::template::{fill_single_slot, FormatError};

pub const DEFAULT_TOPIC: &str = "weather";
pub const CHAT_NAME: &str = "ParliamentChat";

const DEFAULT_AGENT_NAME: &str = "Agent";
const DEFAULT_AGENT_INSTRUCTIONS: &str = "You are a helpful assistant.";
const DEFAULT_MODERATOR_INSTRUCTIONS: &str = "You are moderating the discussion.";
const DEFAULT_MODERATOR_DESCRIPTION: &str = "A skilled moderator.";

/// Picks the provider a member runs on.
pub trait ProviderSelector {
    fn select(&mut self, member: &PersonaRecord) -> Provider;
}

impl<F> ProviderSelector for F
where
    F: FnMut(&PersonaRecord) -> Provider,
{
    fn select(&mut self, member: &PersonaRecord) -> Provider {
        self(member)
    }
}

/// Uniform choice over every provider.
pub struct RandomProviderSelector {
    rng: StdRng,
}

impl RandomProviderSelector {
    pub fn new() -> Self {
        RandomProviderSelector {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible selection for a given seed.
    pub fn seeded(seed: u64) -> Self {
        RandomProviderSelector {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomProviderSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderSelector for RandomProviderSelector {
    fn select(&mut self, _member: &PersonaRecord) -> Provider {
        *Provider::ALL
            .choose(&mut self.rng)
            .unwrap_or(&Provider::Azure)
    }
}

/// Cycles through a fixed list of providers.
pub struct SequenceProviderSelector {
    providers: Vec<Provider>,
    next: usize,
}

impl SequenceProviderSelector {
    pub fn new(providers: Vec<Provider>) -> Self {
        SequenceProviderSelector { providers, next: 0 }
    }
}

impl ProviderSelector for SequenceProviderSelector {
    fn select(&mut self, _member: &PersonaRecord) -> Provider {
        if self.providers.is_empty() {
            return Provider::Azure;
        }
        let provider = self.providers[self.next % self.providers.len()];
        self.next += 1;
        provider
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The moderator's provider could not produce a client.
    ProviderUnavailable(Provider),
    Format(FormatError),
    GroupChat(GroupChatError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::ProviderUnavailable(provider) => write!(
                f,
                "Could not create {} client for group chat management",
                provider
            ),
            SessionError::Format(err) => write!(f, "Moderator instructions: {}", err),
            SessionError::GroupChat(err) => write!(f, "Group chat failed: {}", err),
        }
    }
}

impl Error for SessionError {}

impl From<FormatError> for SessionError {
    fn from(err: FormatError) -> Self {
        SessionError::Format(err)
    }
}

impl From<GroupChatError> for SessionError {
    fn from(err: GroupChatError) -> Self {
        SessionError::GroupChat(err)
    }
}

/// The moderator's client plus the selection policy it applies.
pub struct Moderator {
    pub client: Arc<dyn ClientWrapper>,
    pub instructions: String,
    pub description: String,
}

/// Trimmed user input, or [`DEFAULT_TOPIC`] when blank.
pub fn resolve_topic(input: &str) -> String {
    let topic = input.trim();
    if topic.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        topic.to_string()
    }
}

pub fn task_for_topic(topic: &str) -> String {
    format!("You are discussing today's topic: {}.", topic)
}

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// One agent per seated member whose selected provider is available, in seating order.
pub fn build_members(
    catalog: &PersonaCatalog,
    factory: &ClientFactory<'_>,
    selector: &mut dyn ProviderSelector,
) -> Vec<Agent> {
    let mut agents = Vec::new();
    for (key, member) in catalog.list_members() {
        let provider = selector.select(member);
        log::info!("Seating {} on {}", key, provider);
        let client = match factory.create_client(provider) {
            Some(client) => client,
            None => {
                log::warn!(
                    "Could not create client '{}', skipping agent creation for {}",
                    provider,
                    key
                );
                continue;
            }
        };
        agents.push(
            Agent::new(non_empty(&member.name, DEFAULT_AGENT_NAME), client)
                .with_system_message(non_empty(&member.instructions, DEFAULT_AGENT_INSTRUCTIONS))
                .with_description(member.description.as_str()),
        );
    }
    agents
}

/// Build the moderator on `provider` with the topic filled into its instructions.
pub fn build_moderator(
    catalog: &PersonaCatalog,
    factory: &ClientFactory<'_>,
    provider: Provider,
    topic: &str,
) -> Result<Moderator, SessionError> {
    let (instructions, description) = match catalog.get_moderator() {
        Some(persona) if !persona.instructions.trim().is_empty() => (
            fill_single_slot(&persona.instructions, topic)?,
            non_empty(&persona.description, DEFAULT_MODERATOR_DESCRIPTION).to_string(),
        ),
        Some(persona) => (
            DEFAULT_MODERATOR_INSTRUCTIONS.to_string(),
            non_empty(&persona.description, DEFAULT_MODERATOR_DESCRIPTION).to_string(),
        ),
        None => {
            log::warn!("No moderator persona configured, using default instructions");
            (
                DEFAULT_MODERATOR_INSTRUCTIONS.to_string(),
                DEFAULT_MODERATOR_DESCRIPTION.to_string(),
            )
        }
    };

    let client = factory.create_client(provider).ok_or_else(|| {
        log::error!("Could not create {} client for group chat management", provider);
        SessionError::ProviderUnavailable(provider)
    })?;

    Ok(Moderator {
        client,
        instructions,
        description,
    })
}

/// An assembled parliament, ready to run.
pub struct ParliamentSession {
    topic: String,
    chat: SelectorGroupChat,
}

impl ParliamentSession {
    /// Build members and moderator and seat them in a selector group chat.
    ///
    /// Members that cannot be seated (no client, or a duplicate name) are skipped with a
    /// warning. Fails only when the moderator cannot be built.
    pub fn assemble(
        catalog: &PersonaCatalog,
        factory: &ClientFactory<'_>,
        selector: &mut dyn ProviderSelector,
        moderator_provider: Provider,
        topic: &str,
        max_messages: usize,
    ) -> Result<Self, SessionError> {
        let members = build_members(catalog, factory, selector);
        let moderator = build_moderator(catalog, factory, moderator_provider, topic)?;
        Ok(Self::new(members, moderator, topic, max_messages))
    }

    /// Seat already-built members under `moderator`, repeated speakers allowed.
    pub fn new(members: Vec<Agent>, moderator: Moderator, topic: &str, max_messages: usize) -> Self {
        let mut chat = SelectorGroupChat::new(CHAT_NAME, moderator.client)
            .with_selector_prompt(moderator.instructions)
            .with_description(moderator.description)
            .with_termination(TerminationCondition::MaxMessages(max_messages))
            .with_allow_repeated_speaker(true);

        for agent in members {
            if let Err(err) = chat.add_participant(agent) {
                log::warn!("Skipping member: {}", err);
            }
        }
        if chat.participants().is_empty() {
            log::warn!("No parliament members could be seated");
        }

        ParliamentSession {
            topic: topic.to_string(),
            chat,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn chat(&self) -> &SelectorGroupChat {
        &self.chat
    }

    /// Run the chat on the session topic.
    ///
    /// With no seated members the run ends immediately with only the task message.
    pub async fn run(&mut self, cancellation: CancellationToken) -> Result<TaskResult, SessionError> {
        let task = task_for_topic(&self.topic);
        if self.chat.participants().is_empty() {
            return Ok(TaskResult {
                messages: vec![ChatMessage::new(USER_SOURCE, task)],
                stop_reason: "No participants".to_string(),
                total_tokens_used: 0,
            });
        }
        Ok(self.chat.run(&task, cancellation).await?)
    }
}
