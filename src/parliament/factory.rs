//! Client factory: turns a [`Provider`] into a configured chat-completion handle.
//!
//! Construction is lazy: no request is made until an agent speaks. A provider whose
//! credentials are incomplete yields `None` and a warning, never an error, so a session can
//! go ahead with whichever providers are configured.

use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::parliament::client_wrapper::ClientWrapper;
use crate::parliament::clients::azure::AzureOpenAIClient;
use crate::parliament::clients::grok::GrokClient;
use crate::parliament::clients::openai::{self, OpenAIClient};
use crate::parliament::config::ProviderCredentials;

/// The LLM backends a parliament member can run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provider {
    Azure,
    Grok,
    OpenAI,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Azure, Provider::Grok, Provider::OpenAI];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Azure => "azure",
            Provider::Grok => "grok",
            Provider::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "azure" => Ok(Provider::Azure),
            "grok" => Ok(Provider::Grok),
            "openai" => Ok(Provider::OpenAI),
            other => Err(FactoryError::InvalidArgument(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// The provider name is not one of `azure`, `grok`, `openai`.
    InvalidArgument(String),
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryError::InvalidArgument(name) => write!(f, "Unknown client type: {}", name),
        }
    }
}

impl Error for FactoryError {}

/// Builds client handles from a borrowed set of credentials.
pub struct ClientFactory<'a> {
    credentials: &'a ProviderCredentials,
}

impl<'a> ClientFactory<'a> {
    pub fn new(credentials: &'a ProviderCredentials) -> Self {
        ClientFactory { credentials }
    }

    /// Resolve a provider by name, then build it.
    ///
    /// Unknown names are an error; known providers with missing credentials are `Ok(None)`.
    pub fn create_client_by_name(
        &self,
        provider_name: &str,
    ) -> Result<Option<Arc<dyn ClientWrapper>>, FactoryError> {
        let provider = provider_name.parse::<Provider>()?;
        Ok(self.create_client(provider))
    }

    pub fn create_client(&self, provider: Provider) -> Option<Arc<dyn ClientWrapper>> {
        match provider {
            Provider::Azure => self.create_azure_client(),
            Provider::Grok => self.create_grok_client(),
            Provider::OpenAI => self.create_openai_client(),
        }
    }

    fn create_azure_client(&self) -> Option<Arc<dyn ClientWrapper>> {
        let settings = match self.credentials.azure.settings() {
            Some(settings) => settings,
            None => {
                log::warn!("Azure credentials are not fully configured. Skipping Azure agent.");
                return None;
            }
        };
        log::debug!("Creating Azure client for deployment {}", settings.deployment);
        Some(Arc::new(AzureOpenAIClient::new(
            settings.api_key,
            settings.endpoint,
            settings.api_version,
            settings.deployment,
        )))
    }

    fn create_grok_client(&self) -> Option<Arc<dyn ClientWrapper>> {
        let settings = match self.credentials.grok.settings() {
            Some(settings) => settings,
            None => {
                log::warn!("Grok credentials are not fully configured. Skipping Grok agent.");
                return None;
            }
        };
        if let Err(err) = reqwest::Url::parse(settings.endpoint) {
            log::warn!(
                "GROK_ENDPOINT '{}' is not an absolute URL ({}). Skipping Grok agent.",
                settings.endpoint,
                err
            );
            return None;
        }
        log::debug!("Creating Grok client for deployment {}", settings.deployment);
        Some(Arc::new(GrokClient::new(
            settings.api_key,
            settings.deployment,
            settings.endpoint,
        )))
    }

    fn create_openai_client(&self) -> Option<Arc<dyn ClientWrapper>> {
        let api_key = match self.credentials.openai.api_key() {
            Some(key) => key,
            None => {
                log::warn!("OPENAI_API_KEY is not set. Skipping OpenAI agent.");
                return None;
            }
        };
        Some(Arc::new(OpenAIClient::new_with_model_string(
            api_key,
            openai::DEFAULT_MODEL,
        )))
    }
}
