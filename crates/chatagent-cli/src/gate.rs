//! Interactive confirmation prompt for sensitive tools.
//!
//! Three choices: approve once, approve everything for the rest of the
//! session, or deny. Ctrl-C, EOF and anything unrecognized deny.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use colored::Colorize;
use rustyline::DefaultEditor;
use serde_json::Value;
use tracing::{debug, info};

use chatagent_agent::ConfirmationGate;
use chatagent_core::utils::truncate_string;

use crate::helpers;

/// Argument values longer than this are clipped in the prompt.
const MAX_ARG_DISPLAY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Choice {
    Once,
    All,
    Deny,
}

fn parse_choice(input: &str) -> Choice {
    match input.trim() {
        "1" => Choice::Once,
        "2" => Choice::All,
        _ => Choice::Deny,
    }
}

/// `  • key: value` lines, sorted by key, long values clipped.
fn argument_lines(args: &HashMap<String, Value>) -> Vec<String> {
    let sorted: BTreeMap<&String, &Value> = args.iter().collect();
    sorted
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("  • {key}: {}", truncate_string(&text, MAX_ARG_DISPLAY, "..."))
        })
        .collect()
}

/// Blocking read of one choice from the terminal.
fn read_choice() -> Choice {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            debug!("confirmation prompt unavailable: {e}");
            return Choice::Deny;
        }
    };
    match editor.readline("Choice [1-3]: ") {
        Ok(line) => parse_choice(&line),
        Err(_) => Choice::Deny,
    }
}

// ─────────────────────────────────────────────
// InteractiveGate
// ─────────────────────────────────────────────

pub struct InteractiveGate {
    allow_all: AtomicBool,
    indicator: bool,
}

impl InteractiveGate {
    pub fn new(allow_all: bool) -> Self {
        Self {
            allow_all: AtomicBool::new(allow_all),
            indicator: false,
        }
    }

    /// Clear and redraw the "thinking" line around the prompt (REPL mode).
    pub fn with_indicator(mut self, indicator: bool) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn allows_all(&self) -> bool {
        self.allow_all.load(Ordering::SeqCst)
    }

    /// Ask again before every sensitive tool.
    pub fn reset(&self) {
        self.allow_all.store(false, Ordering::SeqCst);
    }

    fn print_request(tool_name: &str, description: &str, args: &HashMap<String, Value>) {
        println!();
        println!("{}", "⚠️  Tool Confirmation Required".yellow().bold());
        println!("{} {}", "Tool:".bold(), tool_name.cyan());
        println!("{} {}", "Description:".bold(), description);
        println!("{}", "Arguments:".bold());
        for line in argument_lines(args) {
            println!("{line}");
        }
        println!();
        println!("{}", "Do you want to execute this tool?".bold());
        println!("  1. Yes, allow once");
        println!("  2. Yes, allow all tools for this session");
        println!("  3. No, deny");
    }
}

#[async_trait]
impl ConfirmationGate for InteractiveGate {
    async fn confirm(
        &self,
        tool_name: &str,
        description: &str,
        args: &HashMap<String, Value>,
    ) -> bool {
        if self.allows_all() {
            debug!(tool = tool_name, "approved by session-wide approval");
            return true;
        }

        if self.indicator {
            helpers::clear_thinking();
        }
        Self::print_request(tool_name, description, args);

        let choice = tokio::task::spawn_blocking(read_choice)
            .await
            .unwrap_or(Choice::Deny);

        let approved = match choice {
            Choice::Once => true,
            Choice::All => {
                self.allow_all.store(true, Ordering::SeqCst);
                println!("{}", "All tools approved for this session.".green());
                true
            }
            Choice::Deny => {
                println!("{}", "Tool execution denied.".red());
                false
            }
        };
        info!(tool = tool_name, approved, "confirmation answered");

        if self.indicator {
            helpers::print_thinking();
        }
        approved
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
