//! Shell tool — run a command in a subprocess with a bounded runtime.
//!
//! A deny-pattern guard blocks destructive commands before they spawn, and
//! an optional workspace restriction blocks paths outside the working dir.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{info, warn};

use chatagent_core::utils::truncate_string;

use super::base::{optional_i64, optional_string, require_string, Tool};

/// Maximum output length before truncation (characters).
const MAX_OUTPUT_LEN: usize = 10_000;

/// Default command timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Dangerous command patterns that are always blocked.
const DENY_PATTERNS: &[&str] = &[
    r"\brm\s+-[rf]{1,2}\b",
    r"\bdel\s+/[fq]\b",
    r"\brmdir\s+/s\b",
    r"\b(format|mkfs|diskpart)\b",
    r"\bdd\s+if=",
    r">\s*/dev/sd",
    r"\b(shutdown|reboot|poweroff)\b",
    r":\(\)\s*\{.*\};\s*:",   // fork bomb
];

// ─────────────────────────────────────────────
// RunShellCommandTool
// ─────────────────────────────────────────────

/// Executes a shell command and reports its stdout, stderr and return code.
pub struct RunShellCommandTool {
    /// Directory commands run in when none is given.
    working_dir: PathBuf,
    /// Default timeout, overridable per call.
    timeout: Duration,
    /// If true, block commands that reference paths outside `working_dir`.
    restrict_to_workspace: bool,
    /// Compiled deny regexes (built once at construction).
    deny_regexes: Vec<Regex>,
}

impl RunShellCommandTool {
    pub fn new(
        working_dir: PathBuf,
        timeout_secs: Option<u64>,
        restrict_to_workspace: bool,
    ) -> Self {
        let deny_regexes: Vec<Regex> = DENY_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        Self {
            working_dir,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            restrict_to_workspace,
            deny_regexes,
        }
    }

    /// Check if a command is safe to execute. Returns an error message if blocked.
    fn guard_command(&self, command: &str, cwd: &Path) -> Option<String> {
        let lower = command.to_lowercase();

        for re in &self.deny_regexes {
            if re.is_match(&lower) {
                warn!(command = command, "command blocked by safety guard");
                return Some(
                    "Error: Command blocked by safety guard (dangerous pattern detected)".into(),
                );
            }
        }

        if self.restrict_to_workspace {
            if command.contains("../") || command.contains("..\\") {
                return Some(
                    "Error: Command blocked, path traversal (../) not allowed in restricted mode"
                        .into(),
                );
            }

            let abs_path_re = Regex::new(r#"(?:/[^\s"']+|[A-Za-z]:\\[^\s"']+)"#).ok();
            if let Some(re) = abs_path_re {
                for cap in re.find_iter(command) {
                    let p = PathBuf::from(cap.as_str());
                    let resolved = if p.exists() {
                        p.canonicalize().unwrap_or(p)
                    } else {
                        p
                    };
                    if !resolved.starts_with(cwd) {
                        return Some(format!(
                            "Error: Command references path '{}' outside workspace",
                            cap.as_str()
                        ));
                    }
                }
            }
        }

        None
    }

    fn resolve_cwd(&self, requested: Option<String>) -> PathBuf {
        match requested.as_deref() {
            None | Some(".") | Some("") => self.working_dir.clone(),
            Some(dir) => {
                let expanded = chatagent_core::utils::expand_home(dir);
                if expanded.is_absolute() {
                    expanded
                } else {
                    self.working_dir.join(expanded)
                }
            }
        }
    }
}

/// Assemble the STDOUT / STDERR / return-code report.
fn format_output(stdout: &str, stderr: &str, code: i32) -> String {
    let mut parts = Vec::new();
    if !stdout.is_empty() {
        parts.push(format!("STDOUT:\n{}", stdout.trim_end()));
    }
    if !stderr.is_empty() {
        parts.push(format!("STDERR:\n{}", stderr.trim_end()));
    }
    parts.push(format!("Return code: {code}"));
    truncate_string(&parts.join("\n\n"), MAX_OUTPUT_LEN, "\n... (output truncated)")
}

#[async_trait]
impl Tool for RunShellCommandTool {
    fn name(&self) -> &str {
        "run_shell_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its output. Use with caution as this can modify the system."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "working_directory": {
                    "type": "string",
                    "description": "Working directory for the command (defaults to current directory)",
                    "default": "."
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds",
                    "default": self.timeout.as_secs()
                }
            },
            "required": ["command"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let command = require_string(&params, "command")?;
        let cwd = self.resolve_cwd(optional_string(&params, "working_directory"));
        let timeout = optional_i64(&params, "timeout")
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(secs as u64))
            .unwrap_or(self.timeout);

        if let Some(err) = self.guard_command(&command, &cwd) {
            return Ok(err);
        }
        if !cwd.is_dir() {
            return Ok(format!(
                "Error: Working directory {} does not exist",
                cwd.display()
            ));
        }

        info!(command = %command, cwd = %cwd.display(), "executing shell command");

        // The child is killed when the timed-out future drops it.
        let child = Command::new(if cfg!(target_os = "windows") { "cmd" } else { "sh" })
            .args(if cfg!(target_os = "windows") {
                vec!["/C", &command]
            } else {
                vec!["-c", &command]
            })
            .current_dir(&cwd)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let code = output.status.code().unwrap_or(-1);
                Ok(format_output(&stdout, &stderr, code))
            }
            Ok(Err(e)) => anyhow::bail!("Command failed: {e}"),
            Err(_) => {
                warn!(command = %command, secs = timeout.as_secs(), "shell command timed out");
                Ok(format!(
                    "Error: Command timed out after {} seconds",
                    timeout.as_secs()
                ))
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
