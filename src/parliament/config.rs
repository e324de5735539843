//! Configuration for the parliament.
//!
//! Everything the harness reads from the outside world is gathered once into a
//! [`ParliamentConfig`] at process entry and passed by reference from there on. Provider
//! credentials come from environment variables; [`ProviderCredentials::from_lookup`] accepts
//! any key lookup so tests never have to touch the real process environment.
//!
//! # Example
//!
//! ```rust
//! use parliament::config::ProviderCredentials;
//!
//! let creds = ProviderCredentials::from_lookup(|key| match key {
//!     "OPENAI_API_KEY" => Some("sk-test".to_string()),
//!     _ => None,
//! });
//! assert!(creds.openai.is_complete());
//! assert!(!creds.azure.is_complete());
//! ```

use std::path::PathBuf;

use crate::parliament::factory::Provider;

pub const AZURE_API_KEY: &str = "AZURE_API_KEY";
pub const AZURE_API_VERSION: &str = "AZURE_API_VERSION";
pub const AZURE_API_ENDPOINT: &str = "AZURE_API_ENDPOINT";
pub const AZURE_DEPLOYMENT_NAME: &str = "AZURE_DEPLOYMENT_NAME";
pub const GROK_DEPLOYMENT_NAME: &str = "GROK_DEPLOYMENT_NAME";
pub const GROK_ENDPOINT: &str = "GROK_ENDPOINT";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Messages a parliament session produces before it stops, the task message included.
pub const DEFAULT_MAX_MESSAGES: usize = 5;

/// Azure OpenAI deployment settings. All four fields are required together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AzureCredentials {
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
}

/// Grok deployment settings. The API key is the Azure key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrokCredentials {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenAICredentials {
    pub api_key: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// A complete Azure bundle, borrowed.
pub struct AzureSettings<'a> {
    pub api_key: &'a str,
    pub api_version: &'a str,
    pub endpoint: &'a str,
    pub deployment: &'a str,
}

pub struct GrokSettings<'a> {
    pub api_key: &'a str,
    pub endpoint: &'a str,
    pub deployment: &'a str,
}

impl AzureCredentials {
    /// Returns the bundle only when every field is non-empty.
    pub fn settings(&self) -> Option<AzureSettings<'_>> {
        Some(AzureSettings {
            api_key: present(&self.api_key)?,
            api_version: present(&self.api_version)?,
            endpoint: present(&self.endpoint)?,
            deployment: present(&self.deployment)?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.settings().is_some()
    }
}

impl GrokCredentials {
    pub fn settings(&self) -> Option<GrokSettings<'_>> {
        Some(GrokSettings {
            api_key: present(&self.api_key)?,
            endpoint: present(&self.endpoint)?,
            deployment: present(&self.deployment)?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.settings().is_some()
    }
}

impl OpenAICredentials {
    pub fn api_key(&self) -> Option<&str> {
        present(&self.api_key)
    }

    pub fn is_complete(&self) -> bool {
        self.api_key().is_some()
    }
}

/// Credential bundles for every provider, read once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub azure: AzureCredentials,
    pub grok: GrokCredentials,
    pub openai: OpenAICredentials,
}

/// Presence of a single environment variable, with the value masked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialStatus {
    pub variable: &'static str,
    pub masked_value: Option<String>,
}

impl ProviderCredentials {
    /// Read every provider variable from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the bundles from an arbitrary key lookup.
    ///
    /// The Grok bundle takes its key from `AZURE_API_KEY`: the parliament's Grok deployment
    /// lives behind the Azure resource and shares its key.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        ProviderCredentials {
            azure: AzureCredentials {
                api_key: lookup(AZURE_API_KEY),
                api_version: lookup(AZURE_API_VERSION),
                endpoint: lookup(AZURE_API_ENDPOINT),
                deployment: lookup(AZURE_DEPLOYMENT_NAME),
            },
            grok: GrokCredentials {
                api_key: lookup(AZURE_API_KEY),
                endpoint: lookup(GROK_ENDPOINT),
                deployment: lookup(GROK_DEPLOYMENT_NAME),
            },
            openai: OpenAICredentials {
                api_key: lookup(OPENAI_API_KEY),
            },
        }
    }

    pub fn is_available(&self, provider: Provider) -> bool {
        match provider {
            Provider::Azure => self.azure.is_complete(),
            Provider::Grok => self.grok.is_complete(),
            Provider::OpenAI => self.openai.is_complete(),
        }
    }

    /// Per-variable presence report, values masked, in a stable order.
    pub fn report(&self) -> Vec<CredentialStatus> {
        let entries: [(&'static str, &Option<String>); 7] = [
            (AZURE_API_KEY, &self.azure.api_key),
            (AZURE_API_VERSION, &self.azure.api_version),
            (AZURE_API_ENDPOINT, &self.azure.endpoint),
            (AZURE_DEPLOYMENT_NAME, &self.azure.deployment),
            (GROK_DEPLOYMENT_NAME, &self.grok.deployment),
            (GROK_ENDPOINT, &self.grok.endpoint),
            (OPENAI_API_KEY, &self.openai.api_key),
        ];
        entries
            .iter()
            .map(|(variable, value)| CredentialStatus {
                variable: *variable,
                masked_value: present(value).map(mask_secret),
            })
            .collect()
    }
}

/// Keep the first and last four characters of a secret and star out the rest.
/// Values of eight characters or fewer are hidden entirely.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

/// Process-wide settings for one parliament run.
#[derive(Clone, Debug)]
pub struct ParliamentConfig {
    /// TOML file holding the persona tables.
    pub persona_path: PathBuf,
    /// Transcript destination, rewritten on every run.
    pub output_path: PathBuf,
    /// Termination bound for the group chat.
    pub max_messages: usize,
    /// Provider the moderator must run on.
    pub moderator_provider: Provider,
    pub credentials: ProviderCredentials,
}

impl Default for ParliamentConfig {
    fn default() -> Self {
        ParliamentConfig {
            persona_path: PathBuf::from("src/config.toml"),
            output_path: PathBuf::from("pub_script.txt"),
            max_messages: DEFAULT_MAX_MESSAGES,
            moderator_provider: Provider::Azure,
            credentials: ProviderCredentials::default(),
        }
    }
}

impl ParliamentConfig {
    /// Defaults with credentials read from the process environment.
    pub fn from_env() -> Self {
        ParliamentConfig {
            credentials: ProviderCredentials::from_env(),
            ..ParliamentConfig::default()
        }
    }

    pub fn with_persona_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.persona_path = path.into();
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_credentials(mut self, credentials: ProviderCredentials) -> Self {
        self.credentials = credentials;
        self
    }
}
