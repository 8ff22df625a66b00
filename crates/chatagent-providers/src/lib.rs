//! Model client layer for ChatAgent.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`] — trait the orchestration loop calls
//! - [`http_provider::HttpProvider`] — OpenAI-compatible HTTP client
//! - [`http_provider::create_provider`] — builder from the loaded config

pub mod http_provider;
pub mod traits;

// Re-export main types for convenience
pub use http_provider::{create_provider, HttpProvider};
pub use traits::{LlmProvider, LlmRequestConfig, ProviderError};
