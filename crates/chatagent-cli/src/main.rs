//! ChatAgent CLI — entry point.
//!
//! # Commands
//!
//! - `chatagent chat [-m MESSAGE] [--model M] [--yes] [--logs]` — REPL or one-shot
//! - `chatagent onboard` — write the default config and skills directory
//! - `chatagent status` — show configuration and provider status

mod gate;
mod helpers;
mod onboard;
mod repl;
mod status;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chatagent_agent::{default_registry, AgentLoop, ContextBuilder, MemoryStore, SkillStore};
use chatagent_core::config::{load_config, Config};
use chatagent_core::utils::{ensure_data_path, expand_home, get_data_path};
use chatagent_providers::http_provider::create_provider;

use crate::gate::InteractiveGate;

/// Log file written when `--logs` is not given.
const LOG_FILE: &str = "chatagent.log";

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// ChatAgent — a tool-using chat assistant for the terminal
#[derive(Parser)]
#[command(name = "chatagent", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent (single-shot or interactive REPL)
    Chat {
        /// Single message (non-interactive). Omit for REPL mode.
        #[arg(short, long)]
        message: Option<String>,

        /// Model to use instead of the configured one
        #[arg(long)]
        model: Option<String>,

        /// Approve every sensitive tool call without asking
        #[arg(short, long, default_value_t = false)]
        yes: bool,

        /// Print debug logs to stderr
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write the default configuration and skills directory
    Onboard,

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat {
            message,
            model,
            yes,
            logs,
        } => {
            init_logging(logs);
            run_chat(message, model, yes).await
        }
        Commands::Onboard => onboard::run(),
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Chat command
// ─────────────────────────────────────────────

async fn run_chat(message: Option<String>, model: Option<String>, approve_all: bool) -> Result<()> {
    let config = load_config(None);
    let mut agent = build_agent_loop(&config, model.as_deref())?;

    let gate = Arc::new(InteractiveGate::new(approve_all).with_indicator(message.is_none()));
    agent.set_confirmation_gate(Some(gate.clone()));

    match message {
        Some(msg) => {
            info!(model = %agent.model(), "processing single message");
            let response = agent.chat(&msg).await.context("agent processing failed")?;
            helpers::print_response(&response);
        }
        None => {
            repl::run(agent, gate).await?;
        }
    }

    Ok(())
}

/// Build an `AgentLoop` from the loaded configuration.
pub fn build_agent_loop(config: &Config, model_override: Option<&str>) -> Result<AgentLoop> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;

    let model = model_override.unwrap_or(&config.agent.model);
    let provider =
        create_provider(&config.provider, model).context("failed to create LLM provider")?;

    let working_dir = if config.tools.restrict_to_workspace {
        let workspace = expand_home(&config.agent.workspace);
        std::fs::create_dir_all(&workspace)
            .with_context(|| format!("failed to create workspace: {}", workspace.display()))?;
        workspace
    } else {
        cwd.clone()
    };

    let skills = Arc::new(SkillStore::new(skill_dirs(config, &cwd)));
    let memory = Arc::new(MemoryStore::new(memory_path(config)));
    info!(
        skills = skills.list_available().len(),
        memory = %memory.path().display(),
        working_dir = %working_dir.display(),
        "agent stores ready"
    );

    let tools = default_registry(config, working_dir, skills.clone(), memory.clone());
    let context = ContextBuilder::new(skills)
        .with_project_instructions(ContextBuilder::load_project_instructions(&cwd));

    let agent = AgentLoop::new(Arc::new(provider), tools, context, memory)
        .with_config(config)
        .with_model(model);

    Ok(agent)
}

/// Skill directories: the configured ones, or `./skills` then the data dir.
pub(crate) fn skill_dirs(config: &Config, cwd: &Path) -> Vec<PathBuf> {
    if config.skills.dirs.is_empty() {
        vec![cwd.join("skills"), get_data_path().join("skills")]
    } else {
        config
            .skills
            .dirs
            .iter()
            .map(|d| expand_home(d))
            .collect()
    }
}

fn memory_path(config: &Config) -> PathBuf {
    match &config.tools.memory_file {
        Some(path) => expand_home(path),
        None => get_data_path().join("memory.json"),
    }
}

/// Initialize tracing/logging.
///
/// Default: info to `~/.chatagent/chatagent.log`. `--logs`: debug to stderr.
/// `RUST_LOG` overrides the level either way.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "chatagent=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
        return;
    }

    let log_file = ensure_data_path().and_then(|dir| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE))
    });

    match log_file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        // No data dir: errors only, to stderr.
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("error"))
            .with_writer(std::io::stderr)
            .init(),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
