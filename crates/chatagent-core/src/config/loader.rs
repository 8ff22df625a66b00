//! Config loader: reads `~/.chatagent/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.chatagent/config.json`
//! 3. `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`
//! 4. `CHATAGENT_<SECTION>__<FIELD>` (override everything above)

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::schema::Config;

/// Errors raised while persisting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from `path` (or the default path) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    let config = read_config_file(&config_path);
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Read the JSON file only, without env overrides.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(config_path)
}

/// Apply environment overrides on top of a loaded config.
///
/// `lookup` resolves a variable name to its value; `load_config` passes
/// `std::env::var`.
///
/// Supported overrides:
/// - `OPENAI_API_KEY` / `CHATAGENT_PROVIDER__API_KEY` → `provider.api_key`
/// - `OPENAI_BASE_URL` / `CHATAGENT_PROVIDER__API_BASE` → `provider.api_base`
/// - `OPENAI_MODEL` / `CHATAGENT_AGENT__MODEL` → `agent.model`
/// - `CHATAGENT_AGENT__MAX_TOKENS`, `CHATAGENT_AGENT__TEMPERATURE`,
///   `CHATAGENT_AGENT__MAX_TOOL_ITERATIONS`, `CHATAGENT_AGENT__WORKSPACE`
/// - `CHATAGENT_TOOLS__EXEC__TIMEOUT`, `CHATAGENT_TOOLS__RESTRICT_TO_WORKSPACE`
fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // OpenAI-style variables first so the namespaced ones can win.
    if let Some(val) = lookup("OPENAI_API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("OPENAI_BASE_URL") {
        config.provider.api_base = val;
    }
    if let Some(val) = lookup("OPENAI_MODEL") {
        config.agent.model = val;
    }

    // Provider
    if let Some(val) = lookup("CHATAGENT_PROVIDER__API_KEY") {
        config.provider.api_key = val;
    }
    if let Some(val) = lookup("CHATAGENT_PROVIDER__API_BASE") {
        config.provider.api_base = val;
    }

    // Agent
    if let Some(val) = lookup("CHATAGENT_AGENT__MODEL") {
        config.agent.model = val;
    }
    if let Some(val) = lookup("CHATAGENT_AGENT__MAX_TOKENS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tokens = Some(n);
        }
    }
    if let Some(val) = lookup("CHATAGENT_AGENT__TEMPERATURE") {
        if let Ok(t) = val.parse::<f64>() {
            config.agent.temperature = t;
        }
    }
    if let Some(val) = lookup("CHATAGENT_AGENT__MAX_TOOL_ITERATIONS") {
        if let Ok(n) = val.parse::<u32>() {
            config.agent.max_tool_iterations = n;
        }
    }
    if let Some(val) = lookup("CHATAGENT_AGENT__WORKSPACE") {
        config.agent.workspace = val;
    }

    // Tools
    if let Some(val) = lookup("CHATAGENT_TOOLS__EXEC__TIMEOUT") {
        if let Ok(n) = val.parse::<u64>() {
            config.tools.exec.timeout = n;
        }
    }
    if let Some(val) = lookup("CHATAGENT_TOOLS__RESTRICT_TO_WORKSPACE") {
        config.tools.restrict_to_workspace = val == "true" || val == "1";
    }

    config
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
