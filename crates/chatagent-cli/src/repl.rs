//! Interactive REPL.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Lines starting with `/` are commands; everything else is one agent turn,
//! which Ctrl-C cancels.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::{debug, info};

use chatagent_agent::AgentLoop;
use chatagent_core::utils::{get_data_path, truncate_string};

use crate::gate::InteractiveGate;
use crate::helpers;

/// Bare exit words accepted besides `/exit` and `/quit` (case-insensitive).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", ":q"];

/// Skill descriptions in `/skills` are clipped to this many characters.
const SKILL_DESC_DISPLAY: usize = 100;

// ─────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Command {
    Exit,
    Help,
    Clear,
    ResetConfirm,
    Status,
    Skills { reload: bool },
    Deactivate(Option<String>),
    Memory,
    Model(Option<String>),
    Unknown(String),
}

/// Parse a `/command [args]` line. `None` means "send to the agent".
fn parse_command(input: &str) -> Option<Command> {
    if is_exit_command(input) {
        return Some(Command::Exit);
    }
    let rest = input.strip_prefix('/')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let arg = (!args.is_empty()).then(|| args.to_string());

    let command = match name.to_lowercase().as_str() {
        "exit" | "quit" => Command::Exit,
        "help" => Command::Help,
        "clear" => Command::Clear,
        "reset-confirm" => Command::ResetConfirm,
        "status" => Command::Status,
        "skills" => Command::Skills {
            reload: args.eq_ignore_ascii_case("reload"),
        },
        "deactivate" => Command::Deactivate(arg),
        "memory" => Command::Memory,
        "model" => Command::Model(arg),
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// Check if input is a bare exit word.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Loop
// ─────────────────────────────────────────────

/// Run the interactive REPL loop.
pub async fn run(mut agent: AgentLoop, gate: Arc<InteractiveGate>) -> Result<()> {
    helpers::print_banner(agent.model());

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "Interrupted. Type '/exit' to quit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\n{}\n", "Goodbye!".green());
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(trimmed) {
            debug!("failed to add history entry: {e}");
        }

        match parse_command(trimmed) {
            Some(Command::Exit) => {
                println!("\n{}\n", "Goodbye!".green());
                break;
            }
            Some(command) => handle_command(command, &mut agent, &gate),
            None => run_turn(&mut agent, trimmed).await,
        }
    }

    save_history(&mut editor, &history_path());

    Ok(())
}

/// One agent turn, cancellable with Ctrl-C.
async fn run_turn(agent: &mut AgentLoop, input: &str) {
    debug!(input, "processing input");
    helpers::print_thinking();

    let outcome = tokio::select! {
        result = agent.chat(input) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    helpers::clear_thinking();

    match outcome {
        Some(Ok(response)) => helpers::print_response(&response),
        Some(Err(e)) => helpers::print_error(&format!("{e:#}")),
        None => {
            info!("turn cancelled");
            println!("\n{}", "Interrupted. Type '/exit' to quit.".yellow());
        }
    }
}

fn handle_command(command: Command, agent: &mut AgentLoop, gate: &InteractiveGate) {
    match command {
        Command::Exit => {}
        Command::Help => helpers::print_help(),
        Command::Clear => {
            agent.clear_history();
            gate.reset();
            println!("\n{}\n", "Conversation history cleared.".green());
        }
        Command::ResetConfirm => {
            gate.reset();
            println!(
                "\n{}\n",
                "Tool confirmations re-enabled. Sensitive tools will ask again.".green()
            );
        }
        Command::Status => {
            println!("\n{} {}", "Status:".bold(), agent.conversation_summary());
            let approvals = if gate.allows_all() { "all approved" } else { "ask" };
            println!("{} {}\n", "Confirmations:".bold(), approvals);
        }
        Command::Skills { reload } => {
            if reload {
                let n = agent.skills().reload();
                println!("\n{}", format!("Reloaded {n} skill(s).").green());
            }
            print_skills(agent);
        }
        Command::Deactivate(None) => println!("\nUsage: /deactivate <skill_name>\n"),
        Command::Deactivate(Some(name)) => {
            if agent.skills().deactivate(&name) {
                println!("\n{}\n", format!("Deactivated skill: {name}").green());
            } else {
                println!("\n{}\n", format!("Skill '{name}' is not active.").yellow());
            }
        }
        Command::Memory => print_memories(agent),
        Command::Model(None) => print_models(agent),
        Command::Model(Some(name)) => {
            let msg = agent.set_model(&name);
            println!("\n{}\n", msg.green());
        }
        Command::Unknown(name) => {
            println!("\n{}", format!("Unknown command: /{name}").red());
            println!("Type {} for available commands.\n", "/help".cyan());
        }
    }
}

// ─────────────────────────────────────────────
// Listings
// ─────────────────────────────────────────────

fn print_skills(agent: &AgentLoop) {
    let skills = agent.skills();
    let names = skills.list_available();

    println!("\n{}\n", format!("Available Skills ({} loaded):", names.len()).bold());
    for name in &names {
        let Some(skill) = skills.describe(name) else {
            continue;
        };
        println!("  • {} - {}", name.cyan(), skill.title);
        if !skill.description.is_empty() {
            println!(
                "    {}",
                truncate_string(&skill.description, SKILL_DESC_DISPLAY, "...")
            );
        }
    }

    println!("\n{}", "Active Skills:".bold());
    let active = skills.active();
    if active.is_empty() {
        println!("  None");
    } else {
        for (name, entry) in &active {
            println!("  • {}: {}", name.green(), entry.task);
        }
    }
    println!();
}

fn print_memories(agent: &AgentLoop) {
    let memories = agent.memory().all();
    if memories.is_empty() {
        println!("\n{}\n", "No memories saved yet.".yellow());
        return;
    }

    println!("\n{}\n", "Saved Memories:".bold());
    for memory in &memories {
        println!("  • {}: {}", memory.key.cyan(), memory.value);
        if !memory.tags.is_empty() {
            println!("    Tags: {}", memory.tags.join(", "));
        }
        println!("    Saved: {}", memory.timestamp);
        println!();
    }
}

/// Group model names for display: Claude, OpenAI GPT, then the rest.
fn model_groups<'a>(models: &[&'a str]) -> Vec<(&'static str, Vec<&'a str>)> {
    let mut claude = Vec::new();
    let mut gpt = Vec::new();
    let mut other = Vec::new();
    for &model in models {
        if model.starts_with("claude") {
            claude.push(model);
        } else if model.starts_with("gpt") {
            gpt.push(model);
        } else {
            other.push(model);
        }
    }
    [("Claude", claude), ("OpenAI GPT", gpt), ("Other", other)]
        .into_iter()
        .filter(|(_, models)| !models.is_empty())
        .collect()
}

fn print_models(agent: &AgentLoop) {
    let current = agent.model();
    println!("\n{} {}\n", "Current Model:".bold(), current.cyan());
    println!("{}", "Available Models:".bold());

    for (group, models) in model_groups(agent.list_available_models()) {
        println!("\n  {}", format!("{group}:").bold());
        for model in models {
            let marker = if model == current {
                format!(" {}", "✓".green())
            } else {
                String::new()
            };
            println!("    • {model}{marker}");
        }
    }

    println!("\n{} /model <model_name>", "Usage:".bold());
    println!("Example: /model claude-sonnet-4-5\n");
}

// ─────────────────────────────────────────────
// History
// ─────────────────────────────────────────────

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        match editor.load_history(&history_path) {
            Ok(()) => debug!("loaded REPL history from {}", history_path.display()),
            Err(e) => debug!("failed to load history from {}: {e}", history_path.display()),
        }
    }

    Ok(editor)
}

/// Save history to disk. Failures are logged, never fatal.
fn save_history(editor: &mut Editor<(), DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            debug!("failed to create history dir {}: {e}", parent.display());
        }
    }
    if let Err(e) = editor.save_history(path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> PathBuf {
    get_data_path().join("history").join("cli_history")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
