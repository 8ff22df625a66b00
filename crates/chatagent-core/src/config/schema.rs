//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentConfig`, `ProviderConfig`, `ToolsConfig`,
//! `SkillsConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration, loaded from `~/.chatagent/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agent: AgentConfig,
    pub provider: ProviderConfig,
    pub tools: ToolsConfig,
    pub skills: SkillsConfig,
}

// ─────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────

/// Orchestration loop settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Workspace directory (file tools resolve relative paths against the cwd,
    /// but `restrictToWorkspace` fences them in here).
    pub workspace: String,
    /// Model identifier sent to the backend.
    pub model: String,
    /// Maximum tokens to generate per response. Unset lets the backend decide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum model round-trips per user turn.
    pub max_tool_iterations: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workspace: "~/.chatagent/workspace".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: None,
            temperature: 0.7,
            max_tool_iterations: 100,
        }
    }
}

// ─────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────

/// OpenAI-compatible endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    pub api_key: String,
    /// API base URL (`/chat/completions` is appended).
    pub api_base: String,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.openai.com/v1".to_string(),
            extra_headers: None,
        }
    }
}

impl ProviderConfig {
    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Tool configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Web tools configuration (search, fetch).
    pub web: WebToolsConfig,
    /// Shell command tool configuration.
    pub exec: ExecToolConfig,
    /// Whether to restrict file operations to the workspace directory.
    pub restrict_to_workspace: bool,
    /// Memory store location. Defaults to `~/.chatagent/memory.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_file: Option<String>,
}

/// Web tools configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebToolsConfig {
    pub search: WebSearchConfig,
    pub fetch: WebFetchConfig,
}

/// Web search configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSearchConfig {
    /// Default number of search results when the model does not ask for a count.
    pub max_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}

/// Web fetch configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebFetchConfig {
    /// Fetched pages are cut to this many characters.
    pub max_chars: usize,
}

impl Default for WebFetchConfig {
    fn default() -> Self {
        Self { max_chars: 10_000 }
    }
}

/// Shell command tool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecToolConfig {
    /// Default timeout in seconds for shell commands.
    pub timeout: u64,
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self { timeout: 30 }
    }
}

// ─────────────────────────────────────────────
// Skills
// ─────────────────────────────────────────────

/// Where skills are discovered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillsConfig {
    /// Extra skill directories, searched before `./skills` and
    /// `<workspace>/skills`. Earlier entries win on name clashes.
    pub dirs: Vec<String>,
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
