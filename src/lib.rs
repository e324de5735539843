//! # Parliament
//!
//! Parliament runs a satirical "virtual parliament": a handful of persona-driven agents,
//! each on whichever LLM provider it was dealt, argue about a topic while a moderator picks
//! who speaks next. The run is bounded by a message count and its transcript is written to
//! disk.
//!
//! The crate is layered leaf-first:
//!
//! * **Clients**: [`ClientWrapper`] implementations for Azure OpenAI, an OpenAI compatible
//!   Grok deployment, and OpenAI itself, see [`clients`]
//! * **Configuration**: [`config::ParliamentConfig`] and [`config::ProviderCredentials`],
//!   read once at startup and passed by reference
//! * **Personas**: [`persona::PersonaCatalog`] loads the TOML persona tables
//! * **Factory**: [`factory::ClientFactory`] turns a [`factory::Provider`] into a client
//!   handle, or `None` when its credentials are incomplete
//! * **Agents and chat**: [`Agent`] wraps an [`LLMSession`]; [`group_chat::SelectorGroupChat`]
//!   lets a moderator pick the next speaker until the message bound is reached
//! * **Session**: [`session::ParliamentSession`] seats members and the moderator
//! * **Transcript**: [`transcript::write`] persists the non-user messages
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use parliament::config::ParliamentConfig;
//! use parliament::factory::ClientFactory;
//! use parliament::persona::PersonaCatalog;
//! use parliament::session::{ParliamentSession, RandomProviderSelector};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     parliament::init_logger();
//!
//!     let config = ParliamentConfig::from_env();
//!     let catalog = PersonaCatalog::load(&config.persona_path);
//!     let factory = ClientFactory::new(&config.credentials);
//!
//!     let mut session = ParliamentSession::assemble(
//!         &catalog,
//!         &factory,
//!         &mut RandomProviderSelector::new(),
//!         config.moderator_provider,
//!         "weather",
//!         config.max_messages,
//!     )?;
//!     let result = session.run(CancellationToken::new()).await?;
//!     parliament::transcript::write(&result.messages, &config.output_path)?;
//!     Ok(())
//! }
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// `RUST_LOG` controls verbosity; without it only `info` and above are shown.
///
/// ```rust
/// parliament::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .try_init();
    });
}

pub mod parliament;

// Re-exporting key items for easier external access.
pub use parliament::agent::Agent;
pub use parliament::client_wrapper;
pub use parliament::client_wrapper::{ClientWrapper, Message, ModelFamily, ModelInfo, Role};
pub use parliament::clients;
pub use parliament::config;
pub use parliament::factory;
pub use parliament::group_chat;
pub use parliament::llm_session::LLMSession;
pub use parliament::persona;
pub use parliament::session;
pub use parliament::template;
pub use parliament::transcript;
