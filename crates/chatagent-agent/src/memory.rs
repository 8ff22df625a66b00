//! Memory system — a small key/value store persisted as JSON.
//!
//! The file looks like `{"memories": [{key, value, timestamp, tags}]}`.
//! It is created on the first save; reads of a missing file see no entries.
//! The agent writes to it through the `save_memory` tool and the REPL's
//! `/memory` command reads it back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatagent_core::utils::timestamp;

// ─────────────────────────────────────────────
// Data model
// ─────────────────────────────────────────────

/// One remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub key: String,
    pub value: String,
    pub timestamp: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryFile {
    #[serde(default)]
    memories: Vec<MemoryEntry>,
}

/// Whether a save created a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Updated,
}

// ─────────────────────────────────────────────
// MemoryStore
// ─────────────────────────────────────────────

/// File-backed memory store.
pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    /// Create a store backed by `path`. Nothing is touched on disk yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<MemoryFile> {
        if !self.path.exists() {
            return Ok(MemoryFile::default());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(MemoryFile::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn store(&self, file: &MemoryFile) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(file)?)?;
        Ok(())
    }

    /// Insert or replace the entry for `key`.
    pub fn save(&self, key: &str, value: &str, tags: Vec<String>) -> anyhow::Result<SaveOutcome> {
        let mut file = self.load()?;
        let entry = MemoryEntry {
            key: key.to_string(),
            value: value.to_string(),
            timestamp: timestamp(),
            tags,
        };

        let outcome = match file.memories.iter_mut().find(|m| m.key == key) {
            Some(existing) => {
                *existing = entry;
                SaveOutcome::Updated
            }
            None => {
                file.memories.push(entry);
                SaveOutcome::Saved
            }
        };

        self.store(&file)?;
        debug!(key = key, ?outcome, path = %self.path.display(), "memory saved");
        Ok(outcome)
    }

    /// All entries in insertion order. A corrupt file reads as empty.
    pub fn all(&self) -> Vec<MemoryEntry> {
        match self.load() {
            Ok(file) => file.memories,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read memory file");
                Vec::new()
            }
        }
    }

    /// Look up a single entry by exact key.
    pub fn get(&self, key: &str) -> Option<MemoryEntry> {
        self.all().into_iter().find(|m| m.key == key)
    }

    /// Case-insensitive match against keys, values, and tags.
    pub fn search(&self, query: &str) -> Vec<MemoryEntry> {
        let needle = query.to_lowercase();
        self.all()
            .into_iter()
            .filter(|m| {
                m.key.to_lowercase().contains(&needle)
                    || m.value.to_lowercase().contains(&needle)
                    || m.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, MemoryStore) {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new(dir.path().join("nested").join("memory.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = store();
        assert!(store.all().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_save_creates_file() {
        let (_dir, store) = store();
        let outcome = store.save("editor", "helix", vec!["prefs".into()]).unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert!(store.path().exists());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["memories"][0]["key"], "editor");
        assert_eq!(json["memories"][0]["tags"][0], "prefs");
        assert!(json["memories"][0]["timestamp"].is_string());
    }

    #[test]
    fn test_save_same_key_updates() {
        let (_dir, store) = store();
        store.save("editor", "vim", vec![]).unwrap();
        store.save("shell", "zsh", vec![]).unwrap();
        let outcome = store.save("editor", "helix", vec![]).unwrap();
        assert_eq!(outcome, SaveOutcome::Updated);

        let all = store.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key, "editor");
        assert_eq!(all[0].value, "helix");
        assert_eq!(store.get("shell").unwrap().value, "zsh");
    }

    #[test]
    fn test_search_matches_key_value_and_tags() {
        let (_dir, store) = store();
        store.save("Editor", "helix", vec![]).unwrap();
        store.save("lang", "Rust", vec!["Work".into()]).unwrap();
        store.save("pet", "cat", vec![]).unwrap();

        assert_eq!(store.search("editor").len(), 1);
        assert_eq!(store.search("rust")[0].key, "lang");
        assert_eq!(store.search("work")[0].key, "lang");
        assert!(store.search("nothing").is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_empty_but_save_fails() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.all().is_empty());
        assert!(store.save("k", "v", vec![]).is_err());
    }
}
