//! Search tools — find files by glob, search file contents by text or regex.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

use super::base::{optional_bool, optional_string, require_string, Tool};
use super::filesystem::resolve_path;

/// Matches listed before the output is cut short.
const MAX_MATCHES: usize = 100;

fn search_root(params: &HashMap<String, Value>, allowed_dir: Option<&Path>) -> anyhow::Result<(String, PathBuf)> {
    let dir = optional_string(params, "directory").unwrap_or_else(|| ".".into());
    let path = resolve_path(&dir, allowed_dir)?;
    if !path.is_dir() {
        anyhow::bail!("Directory {dir} does not exist");
    }
    Ok((dir, path))
}

// ─────────────────────────────────────────────
// GlobTool
// ─────────────────────────────────────────────

/// Finds files matching a glob pattern.
pub struct GlobTool {
    allowed_dir: Option<PathBuf>,
}

impl GlobTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (e.g., '*.py', '**/*.txt'). Supports recursive search with '**'."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern to match files (e.g., '*.py', 'src/**/*.js')"
                },
                "directory": {
                    "type": "string",
                    "description": "Base directory to search from (defaults to current directory)",
                    "default": "."
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let pattern = require_string(&params, "pattern")?;
        let pattern_path = Path::new(&pattern);
        if pattern_path.is_absolute()
            || pattern_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            anyhow::bail!(
                "Invalid glob pattern: '{pattern}' must be relative to the search directory and must not contain '..'"
            );
        }
        let (_, base) = search_root(&params, self.allowed_dir.as_deref())?;

        let full = base.join(&pattern);
        let full = full
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid pattern path"))?;

        let mut matches: Vec<String> = glob::glob(full)
            .map_err(|e| anyhow::anyhow!("Invalid glob pattern: {e}"))?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .map(|p| p.strip_prefix(&base).unwrap_or(&p).display().to_string())
            .collect();
        matches.sort();

        debug!(pattern = %pattern, count = matches.len(), "glob finished");

        if matches.is_empty() {
            return Ok(format!("No files found matching pattern: {pattern}"));
        }
        Ok(format!(
            "Found {} file(s):\n\n{}",
            matches.len(),
            matches.join("\n")
        ))
    }
}

// ─────────────────────────────────────────────
// SearchFileContentTool
// ─────────────────────────────────────────────

/// Searches for a literal or regex pattern inside files.
pub struct SearchFileContentTool {
    allowed_dir: Option<PathBuf>,
}

impl SearchFileContentTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for SearchFileContentTool {
    fn name(&self) -> &str {
        "search_file_content"
    }

    fn description(&self) -> &str {
        "Search for text patterns in files. Supports regex patterns and can search across multiple files."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Text or regex pattern to search for"
                },
                "file_pattern": {
                    "type": "string",
                    "description": "File glob pattern to search in (e.g., '*.py', '**/*.txt')",
                    "default": "**/*"
                },
                "directory": {
                    "type": "string",
                    "description": "Base directory to search from",
                    "default": "."
                },
                "case_sensitive": {
                    "type": "boolean",
                    "description": "Whether to perform case-sensitive search",
                    "default": true
                },
                "regex": {
                    "type": "boolean",
                    "description": "Whether to treat pattern as regex",
                    "default": false
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let pattern = require_string(&params, "pattern")?;
        let file_pattern = optional_string(&params, "file_pattern").unwrap_or_else(|| "**/*".into());
        let case_sensitive = optional_bool(&params, "case_sensitive", true);
        let is_regex = optional_bool(&params, "regex", false);
        let (_, base) = search_root(&params, self.allowed_dir.as_deref())?;

        let source = if is_regex {
            pattern.clone()
        } else {
            regex::escape(&pattern)
        };
        let matcher = RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid regex pattern: {e}"))?;

        let file_glob =
            Pattern::new(&file_pattern).map_err(|e| anyhow::anyhow!("Invalid file pattern: {e}"))?;
        let glob_opts = MatchOptions {
            require_literal_separator: true,
            ..MatchOptions::new()
        };

        let mut results = Vec::new();
        for entry in WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let rel = entry.path().strip_prefix(&base).unwrap_or(entry.path());
            if !file_glob.matches_path_with(rel, glob_opts) {
                continue;
            }

            // Binary or unreadable files are skipped silently.
            let Ok(bytes) = std::fs::read(entry.path()) else {
                continue;
            };
            if bytes.contains(&0) {
                continue;
            }
            let Ok(text) = String::from_utf8(bytes) else {
                continue;
            };

            for (idx, line) in text.lines().enumerate() {
                if matcher.is_match(line) {
                    results.push(format!("{}:{}: {}", rel.display(), idx + 1, line.trim_end()));
                }
            }
        }

        debug!(pattern = %pattern, matches = results.len(), "content search finished");

        if results.is_empty() {
            return Ok(format!("No matches found for pattern: {pattern}"));
        }

        let mut out = format!("Found {} match(es):\n\n", results.len());
        out.push_str(&results[..results.len().min(MAX_MATCHES)].join("\n"));
        if results.len() > MAX_MATCHES {
            out.push_str(&format!(
                "\n\n... and {} more matches",
                results.len() - MAX_MATCHES
            ));
        }
        Ok(out)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
