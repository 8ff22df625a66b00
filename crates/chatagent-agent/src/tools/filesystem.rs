//! Filesystem tools — read, write, replace, list directory.
//!
//! Each tool optionally restricts paths to an `allowed_dir`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use walkdir::WalkDir;

use chatagent_core::utils::expand_home;

use super::base::{optional_bool, optional_string, require_string, Tool};

// ─────────────────────────────────────────────
// Shared path helper
// ─────────────────────────────────────────────

/// Collapse `.` and `..` without touching the filesystem.
///
/// Returns `None` when a `..` would climb above the start of the path.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

/// Canonicalize the deepest existing ancestor and re-attach the rest, so
/// symlinks are resolved even for files that do not exist yet.
fn canonicalize_existing(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    for name in rest.iter().rev() {
        resolved.push(name);
    }
    resolved
}

/// Resolve a user-supplied path, optionally restricting it to `allowed_dir`.
///
/// When restricted, relative paths are taken from `allowed_dir`, and `Err`
/// is returned if the result (after `..` and symlinks) leaves it.
pub(crate) fn resolve_path(path: &str, allowed_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let expanded = expand_home(path);

    let Some(allowed) = allowed_dir else {
        return Ok(canonicalize_existing(&expanded));
    };

    let root = allowed
        .canonicalize()
        .unwrap_or_else(|_| allowed.to_path_buf());
    let denied = || {
        anyhow::anyhow!(
            "Access denied: path '{}' is outside allowed directory '{}'",
            path,
            root.display()
        )
    };

    let joined = if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    };
    let normalized = normalize(&joined).ok_or_else(denied)?;
    let resolved = canonicalize_existing(&normalized);

    if !resolved.starts_with(&root) {
        return Err(denied());
    }
    Ok(resolved)
}

// ─────────────────────────────────────────────
// ReadFileTool
// ─────────────────────────────────────────────

/// Reads and returns the entire content of a file.
pub struct ReadFileTool {
    allowed_dir: Option<PathBuf>,
}

impl ReadFileTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Returns the file content as text."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to read"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "file_path")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if !path.exists() {
            anyhow::bail!("File not found: {}", path_str);
        }
        if !path.is_file() {
            anyhow::bail!("Not a file: {}", path_str);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Ok(format!("File: {path_str}\n\n{content}"))
    }
}

// ─────────────────────────────────────────────
// WriteFileTool
// ─────────────────────────────────────────────

/// Creates or overwrites a file with the given content.
pub struct WriteFileTool {
    allowed_dir: Option<PathBuf>,
}

impl WriteFileTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it if it doesn't exist or overwriting if it does. \
         Parent directories are created automatically."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "file_path")?;
        let content = require_string(&params, "content")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!("Failed to create directory {}: {e}", parent.display())
            })?;
        }

        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
        Ok(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path_str
        ))
    }
}

// ─────────────────────────────────────────────
// ReplaceTool
// ─────────────────────────────────────────────

/// Replaces the first occurrence of a text snippet within a file.
pub struct ReplaceTool {
    allowed_dir: Option<PathBuf>,
}

impl ReplaceTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for ReplaceTool {
    fn name(&self) -> &str {
        "replace"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing the first occurrence of `old_text` with `new_text`. \
         Include enough context in `old_text` to uniquely identify the replacement site."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file to edit"
                },
                "old_text": {
                    "type": "string",
                    "description": "Exact text to find and replace"
                },
                "new_text": {
                    "type": "string",
                    "description": "Text to put in its place"
                }
            },
            "required": ["file_path", "old_text", "new_text"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = require_string(&params, "file_path")?;
        let old_text = require_string(&params, "old_text")?;
        let new_text = require_string(&params, "new_text")?;
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if !path.is_file() {
            anyhow::bail!("File not found: {}", path_str);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;

        if old_text.is_empty() || !content.contains(&old_text) {
            anyhow::bail!("Old text not found in {}", path_str);
        }

        let updated = content.replacen(&old_text, &new_text, 1);
        tokio::fs::write(&path, &updated)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;

        Ok(format!("Successfully replaced text in {path_str}"))
    }
}

// ─────────────────────────────────────────────
// ListDirectoryTool
// ─────────────────────────────────────────────

/// Lists the contents of a directory, optionally recursively.
pub struct ListDirectoryTool {
    allowed_dir: Option<PathBuf>,
}

impl ListDirectoryTool {
    pub fn new(allowed_dir: Option<PathBuf>) -> Self {
        Self { allowed_dir }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List files and folders in a directory. Shows [DIR] and [FILE] entries with file sizes."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "directory_path": {
                    "type": "string",
                    "description": "Path to the directory (defaults to current directory)",
                    "default": "."
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to list subdirectories recursively",
                    "default": false
                }
            },
            "required": []
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let path_str = optional_string(&params, "directory_path").unwrap_or_else(|| ".".into());
        let recursive = optional_bool(&params, "recursive", false);
        let path = resolve_path(&path_str, self.allowed_dir.as_deref())?;

        if !path.is_dir() {
            anyhow::bail!("Not a directory: {}", path_str);
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut lines = Vec::new();
        for entry in WalkDir::new(&path)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| anyhow::anyhow!("Failed to read directory: {e}"))?;
            let rel = entry
                .path()
                .strip_prefix(&path)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            if entry.file_type().is_dir() {
                lines.push(format!("[DIR]  {rel}/"));
            } else {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                lines.push(format!("[FILE] {rel} ({size} bytes)"));
            }
        }

        if lines.is_empty() {
            Ok(format!("Directory {path_str} is empty"))
        } else {
            Ok(format!("Contents of {path_str}:\n\n{}", lines.join("\n")))
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_params(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    // ── ReadFileTool ──

    #[tokio::test]
    async fn test_read_file_success() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        std::fs::write(&file, "Hello, ChatAgent!").unwrap();
        let path = file.to_str().unwrap();

        let tool = ReadFileTool::new(None);
        let result = tool.execute(make_params(&[("file_path", path)])).await.unwrap();
        assert_eq!(result, format!("File: {path}\n\nHello, ChatAgent!"));
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let tool = ReadFileTool::new(None);
        let result = tool
            .execute(make_params(&[("file_path", "/tmp/nonexistent_chatagent_test_file.txt")]))
            .await;
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_read_file_restricted() {
        let dir = tempfile::tempdir().unwrap();
        let allowed = dir.path().join("safe");
        std::fs::create_dir(&allowed).unwrap();
        let outside = dir.path().join("secret.txt");
        std::fs::write(&outside, "nope").unwrap();

        let tool = ReadFileTool::new(Some(allowed));
        let result = tool
            .execute(make_params(&[("file_path", outside.to_str().unwrap())]))
            .await;
        assert!(result.unwrap_err().to_string().contains("Access denied"));
    }

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(
            normalize(Path::new("/ws/a/./b/../c")),
            Some(PathBuf::from("/ws/a/c"))
        );
        assert_eq!(normalize(Path::new("/ws/../..")), None);
        assert_eq!(normalize(Path::new("a/../../b")), None);
    }

    #[test]
    fn test_resolve_relative_against_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().canonicalize().unwrap();

        let resolved = resolve_path("notes/new.txt", Some(&ws)).unwrap();
        assert_eq!(resolved, ws.join("notes").join("new.txt"));

        let err = resolve_path("../outside.txt", Some(&ws)).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_out_of_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        std::fs::create_dir(&ws).unwrap();
        std::os::unix::fs::symlink(dir.path(), ws.join("link")).unwrap();

        let err = resolve_path("link/escaped.txt", Some(&ws)).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    // ── WriteFileTool ──

    #[tokio::test]
    async fn test_write_file_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sub").join("deep").join("file.txt");

        let tool = WriteFileTool::new(None);
        let result = tool
            .execute(make_params(&[
                ("file_path", file.to_str().unwrap()),
                ("content", "deep content"),
            ]))
            .await
            .unwrap();
        assert!(result.starts_with("Successfully wrote 12 bytes"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "deep content");
    }

    #[tokio::test]
    async fn test_write_file_traversal_stays_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().join("ws");
        std::fs::create_dir(&ws).unwrap();
        let sneaky = ws.join("nonexist").join("..").join("..").join("escaped.txt");

        let tool = WriteFileTool::new(Some(ws));
        let result = tool
            .execute(make_params(&[
                ("file_path", sneaky.to_str().unwrap()),
                ("content", "hello"),
            ]))
            .await;

        assert!(result.unwrap_err().to_string().contains("Access denied"));
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn test_write_file_relative_path_lands_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path().canonicalize().unwrap();

        let tool = WriteFileTool::new(Some(ws.clone()));
        let result = tool
            .execute(make_params(&[("file_path", "new.txt"), ("content", "hello")]))
            .await
            .unwrap();

        assert!(result.starts_with("Successfully wrote 5 bytes"));
        assert_eq!(std::fs::read_to_string(ws.join("new.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_write_requires_confirmation() {
        assert!(WriteFileTool::new(None).requires_confirmation());
        assert!(!ReadFileTool::new(None).requires_confirmation());
        assert!(!ReplaceTool::new(None).requires_confirmation());
    }

    // ── ReplaceTool ──

    #[tokio::test]
    async fn test_replace_first_occurrence_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("multi.txt");
        std::fs::write(&file, "aaa bbb aaa").unwrap();

        let tool = ReplaceTool::new(None);
        let result = tool
            .execute(make_params(&[
                ("file_path", file.to_str().unwrap()),
                ("old_text", "aaa"),
                ("new_text", "ccc"),
            ]))
            .await
            .unwrap();
        assert!(result.contains("Successfully replaced"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "ccc bbb aaa");
    }

    #[tokio::test]
    async fn test_replace_missing_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("edit2.txt");
        std::fs::write(&file, "ABC").unwrap();

        let tool = ReplaceTool::new(None);
        let result = tool
            .execute(make_params(&[
                ("file_path", file.to_str().unwrap()),
                ("old_text", "XYZ"),
                ("new_text", "123"),
            ]))
            .await;
        assert!(result.unwrap_err().to_string().contains("Old text not found"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "ABC");
    }

    // ── ListDirectoryTool ──

    #[tokio::test]
    async fn test_list_directory_flat() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("file_a.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        std::fs::write(dir.path().join("subdir").join("inner.txt"), "").unwrap();

        let tool = ListDirectoryTool::new(None);
        let result = tool
            .execute(make_params(&[("directory_path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(result.contains("[FILE] file_a.txt (5 bytes)"));
        assert!(result.contains("[DIR]  subdir/"));
        assert!(!result.contains("inner.txt"));
    }

    #[tokio::test]
    async fn test_list_directory_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        std::fs::write(dir.path().join("subdir").join("inner.txt"), "").unwrap();

        let mut params = make_params(&[("directory_path", dir.path().to_str().unwrap())]);
        params.insert("recursive".into(), Value::Bool(true));

        let result = ListDirectoryTool::new(None).execute(params).await.unwrap();
        assert!(result.contains("[FILE] subdir/inner.txt (0 bytes)"));
    }

    #[tokio::test]
    async fn test_list_directory_empty() {
        let dir = tempfile::tempdir().unwrap();
        let result = ListDirectoryTool::new(None)
            .execute(make_params(&[("directory_path", dir.path().to_str().unwrap())]))
            .await
            .unwrap();
        assert!(result.ends_with("is empty"));
    }

    #[tokio::test]
    async fn test_list_directory_not_a_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, "").unwrap();

        let result = ListDirectoryTool::new(None)
            .execute(make_params(&[("directory_path", file.to_str().unwrap())]))
            .await;
        assert!(result.is_err());
    }
}
