// src/parliament/mod.rs

pub mod agent;
pub mod client_wrapper;
pub mod clients;
pub mod config;
pub mod factory;
pub mod group_chat;
pub mod llm_session;
pub mod persona;
pub mod session;
pub mod template;
pub mod transcript;

// Export LLMSession so it can be reached as parliament::LLMSession
pub use llm_session::LLMSession;
