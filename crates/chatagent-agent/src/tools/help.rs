//! Assistant tools — built-in CLI help and a codebase survey.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use glob::Pattern;
use serde_json::{json, Value};
use walkdir::WalkDir;

use super::base::{optional_string, optional_string_list, require_string, Tool};
use super::filesystem::resolve_path;

/// Cap on directories listed under "Key Directories".
const MAX_KEY_DIRS: usize = 20;

const HELP_TEXT: &str = "\
ChatAgent CLI Help
==================

Question: {question}

Available Commands:
- Type your message to chat with the AI
- /help              Show the command list
- /model [name]      Show or switch the model
- /clear             Clear conversation history and reset approvals
- /reset-confirm     Ask again before sensitive tools
- /status            Show conversation summary
- /skills [reload]   List (or rescan) skills
- /deactivate <name> Deactivate an active skill
- /memory            Show saved memories
- /exit, /quit       Leave the program

Available Tools:
- read_file: Read file contents
- write_file: Write content to a file (asks for confirmation)
- replace: Edit a file by replacing text
- list_directory: List directory contents
- glob: Find files matching a pattern
- search_file_content: Search for text in files
- run_shell_command: Execute shell commands (asks for confirmation)
- web_fetch: Fetch content from URLs (asks for confirmation)
- google_web_search: Search the web (asks for confirmation)
- save_memory: Save important information
- codebase_investigator: Summarize a project's layout
- activate_skill: Activate a skill

Features:
- Multi-turn conversations with context
- Function calling for tool usage
- Skills support for specialized tasks
- Memory system for saving information

For more detailed information, refer to the documentation or ask specific questions.";

// ─────────────────────────────────────────────
// CliHelpTool
// ─────────────────────────────────────────────

pub struct CliHelpTool;

#[async_trait]
impl Tool for CliHelpTool {
    fn name(&self) -> &str {
        "cli_help"
    }

    fn description(&self) -> &str {
        "Get help and guidance on using the ChatAgent CLI. Provides information about commands, features, and best practices."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Question or topic to get help with"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let question = optional_string(&params, "question").unwrap_or_default();
        Ok(HELP_TEXT.replace("{question}", &question))
    }
}

// ─────────────────────────────────────────────
// CodebaseInvestigatorTool
// ─────────────────────────────────────────────

/// Summarizes a directory tree: file types, key directories, next steps.
pub struct CodebaseInvestigatorTool {
    allowed_dir: Option<PathBuf>,
}

impl CodebaseInvestigatorTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

fn suggestions(task: &str, patterns: &[String]) -> &'static [&'static str] {
    let task = task.to_lowercase();
    if task.contains("python") || patterns.iter().any(|p| p.ends_with(".py")) {
        &[
            "- Use 'glob' with pattern '**/*.py' to find all Python files",
            "- Use 'search_file_content' to search for specific code patterns",
            "- Check for 'requirements.txt', 'setup.py', or 'pyproject.toml'",
        ]
    } else if task.contains("javascript") || task.contains("js") {
        &[
            "- Use 'glob' with pattern '**/*.js' to find JavaScript files",
            "- Look for 'package.json' for project dependencies",
        ]
    } else {
        &[
            "- Use 'glob' to find files by pattern",
            "- Use 'search_file_content' to search within files",
            "- Use 'read_file' to examine specific files",
        ]
    }
}

#[async_trait]
impl Tool for CodebaseInvestigatorTool {
    fn name(&self) -> &str {
        "codebase_investigator"
    }

    fn description(&self) -> &str {
        "Analyze and investigate codebase structure, find files, search code, and understand project organization. Use this for complex codebase exploration tasks."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "Investigation task description (e.g., 'find all Python files', 'analyze project structure')"
                },
                "directory": {
                    "type": "string",
                    "description": "Base directory to investigate (defaults to current directory)",
                    "default": "."
                },
                "file_patterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "File name patterns to focus on (e.g., ['*.py', '*.js'])"
                }
            },
            "required": ["task"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let task = require_string(&params, "task")?;
        let directory = optional_string(&params, "directory").unwrap_or_else(|| ".".into());
        let raw_patterns = optional_string_list(&params, "file_patterns");

        let root = resolve_path(&directory, self.allowed_dir.as_deref())?;
        if !root.is_dir() {
            return Ok(format!("Error: Directory {directory} does not exist"));
        }

        let patterns: Vec<Pattern> = if raw_patterns.is_empty() {
            vec![Pattern::new("*")?]
        } else {
            raw_patterns
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<Result<_, _>>()
                .map_err(|e| anyhow::anyhow!("Invalid file pattern: {e}"))?
        };

        let mut by_ext: HashMap<String, usize> = HashMap::new();
        let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();

        for entry in WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_name = entry.file_name().to_string_lossy();
            if !patterns.iter().any(|p| p.matches(&file_name)) {
                continue;
            }

            let ext = entry
                .path()
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "no_extension".into());
            *by_ext.entry(ext).or_default() += 1;

            if let Some(parent) = entry.path().parent() {
                if let Ok(rel) = parent.strip_prefix(&root) {
                    if !rel.as_os_str().is_empty() {
                        dirs.insert(rel.to_path_buf());
                    }
                }
            }
        }

        let mut ext_counts: Vec<(String, usize)> = by_ext.into_iter().collect();
        ext_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut out = vec![
            format!("Codebase Investigation Task: {task}"),
            format!("Directory: {directory}"),
            String::new(),
            "=== Directory Structure ===".to_string(),
            format!("Total directories: {}", dirs.len()),
            "File types found:".to_string(),
        ];
        out.extend(
            ext_counts
                .iter()
                .map(|(ext, n)| format!("  {ext}: {n} files")),
        );

        out.push(String::new());
        out.push("=== Key Directories ===".to_string());
        out.extend(
            dirs.iter()
                .take(MAX_KEY_DIRS)
                .map(|d| format!("  {}/", d.display())),
        );

        out.push(String::new());
        out.push("=== Suggestions ===".to_string());
        out.extend(suggestions(&task, &raw_patterns).iter().map(|s| s.to_string()));

        Ok(out.join("\n"))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
