//! Persona store.
//!
//! Personas live in a TOML file: one top-level table per persona keyed by its lowercase
//! name, plus the moderator nested under `[agents.scripter]`.
//!
//! ```toml
//! [shauli]
//! name = "Shauli"
//! role = "Parliament Group Leader"
//! instructions = "You are Shauli..."
//! description = "Group leader, humorous, self-centered facilitator."
//!
//! [agents.scripter]
//! name = "Scripter"
//! role = "TV Script Writer"
//! instructions = "You write the script of a show about {}."
//! ```
//!
//! Loading never fails: a missing or malformed file is logged and yields an empty catalog,
//! and lookups for unknown keys return `None`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::Path;

/// Parliament members, in the order they are seated.
pub const MEMBER_KEYS: [&str; 5] = ["shauli", "amatzia", "karakov", "hektor", "avi"];

/// Key of the moderator persona; stored under the `agents` table.
pub const MODERATOR_KEY: &str = "scripter";
pub const MODERATOR_GROUP: &str = "agents";
pub const TRANSLATOR_KEY: &str = "translator";

const PERSONA_FIELDS: [&str; 4] = ["name", "role", "instructions", "description"];

/// One persona as written in the configuration. Missing string fields are empty.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct PersonaRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    /// System prompt. The moderator's may carry one `{}` slot for the topic.
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug)]
pub enum PersonaError {
    Io(std::io::Error),
    Parse(String),
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::Io(err) => write!(f, "Could not read persona file: {}", err),
            PersonaError::Parse(msg) => write!(f, "Could not decode persona TOML: {}", msg),
        }
    }
}

impl Error for PersonaError {}

/// Lowercase key to persona, plus the nested moderator.
#[derive(Clone, Debug, Default)]
pub struct PersonaCatalog {
    personas: BTreeMap<String, PersonaRecord>,
    moderator: Option<PersonaRecord>,
}

fn is_persona_table(table: &toml::Table) -> bool {
    PERSONA_FIELDS
        .iter()
        .any(|field| matches!(table.get(*field), Some(toml::Value::String(_))))
}

fn to_record(key: &str, table: &toml::Table) -> Option<PersonaRecord> {
    if !is_persona_table(table) {
        return None;
    }
    match toml::Value::Table(table.clone()).try_into::<PersonaRecord>() {
        Ok(record) => Some(record),
        Err(err) => {
            log::warn!("Skipping persona '{}': {}", key, err);
            None
        }
    }
}

impl PersonaCatalog {
    /// Load the catalog from `path`, degrading to an empty catalog on any error.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(catalog) => {
                log::info!(
                    "Loaded {} personas from {}",
                    catalog.personas.len() + catalog.moderator.iter().count(),
                    path.display()
                );
                catalog
            }
            Err(PersonaError::Io(err)) => {
                log::error!(
                    "The configuration file was not found at {}: {}",
                    path.display(),
                    err
                );
                PersonaCatalog::default()
            }
            Err(err) => {
                log::error!("Could not decode the TOML file at {}: {}", path.display(), err);
                PersonaCatalog::default()
            }
        }
    }

    /// Like [`PersonaCatalog::load`] but surfaces the failure.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, PersonaError> {
        let text = std::fs::read_to_string(path).map_err(PersonaError::Io)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PersonaError> {
        let root: toml::Table =
            toml::from_str(text).map_err(|err| PersonaError::Parse(err.to_string()))?;

        let mut catalog = PersonaCatalog::default();
        for (key, value) in &root {
            let table = match value {
                toml::Value::Table(table) => table,
                _ => continue,
            };
            if key.to_lowercase() == MODERATOR_GROUP {
                catalog.moderator = table
                    .get(MODERATOR_KEY)
                    .and_then(|v| v.as_table())
                    .and_then(|t| to_record(MODERATOR_KEY, t));
                continue;
            }
            if let Some(record) = to_record(key, table) {
                catalog.personas.insert(key.to_lowercase(), record);
            }
        }
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty() && self.moderator.is_none()
    }

    /// Case-insensitive lookup of a top-level persona.
    pub fn get_member(&self, key: &str) -> Option<&PersonaRecord> {
        self.personas.get(&key.to_lowercase())
    }

    /// Lookup by name, routing `"scripter"` to the nested moderator.
    pub fn get_persona(&self, key: &str) -> Option<&PersonaRecord> {
        if key.eq_ignore_ascii_case(MODERATOR_KEY) {
            return self.get_moderator();
        }
        self.get_member(key)
    }

    pub fn get_moderator(&self) -> Option<&PersonaRecord> {
        self.moderator.as_ref()
    }

    pub fn get_translator(&self) -> Option<&PersonaRecord> {
        self.personas.get(TRANSLATOR_KEY)
    }

    /// Parliament members present in the catalog, in seating order.
    pub fn list_members(&self) -> Vec<(&'static str, &PersonaRecord)> {
        MEMBER_KEYS
            .iter()
            .filter_map(|key| self.personas.get(*key).map(|record| (*key, record)))
            .collect()
    }

    /// Every top-level persona, members and translator alike, by key.
    pub fn all_personas(&self) -> &BTreeMap<String, PersonaRecord> {
        &self.personas
    }
}
