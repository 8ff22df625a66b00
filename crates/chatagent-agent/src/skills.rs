//! Skill store — discovers skill documents and tracks which are active.
//!
//! A skill is a directory holding a `SKILL.md` file, optionally with
//! `references/` and `assets/` subdirectories of extra markdown:
//!
//! ```text
//! ---
//! name: pdf
//! description: "Extract text and tables from PDF files"
//! ---
//!
//! # PDF Processing
//!
//! Use `run_shell_command` with `pdftotext` ...
//! ```
//!
//! The store is shared between the `activate_skill` tool (which writes the
//! active set) and the context builder (which reads it on every prompt
//! rebuild), so state sits behind `RwLock`s and the store travels in an `Arc`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use chatagent_core::utils::truncate_string;

/// Characters of body text kept as a preview.
const PREVIEW_CHARS: usize = 500;

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// A discovered skill.
#[derive(Clone, Debug, PartialEq)]
pub struct Skill {
    /// Front-matter `name`, or the directory name.
    pub name: String,
    /// First `# ` heading, or the name.
    pub title: String,
    pub description: String,
    /// Path to `SKILL.md`.
    pub path: PathBuf,
    /// Start of the body, front matter removed.
    pub preview: String,
    /// Raw front-matter pairs in file order.
    pub frontmatter: Vec<(String, String)>,
}

/// A skill plus the task it was activated for.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSkill {
    pub task: String,
    pub skill: Skill,
}

/// Markdown resources shipped alongside a skill.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkillResources {
    pub references: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
}

impl SkillResources {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty() && self.assets.is_empty()
    }
}

// ─────────────────────────────────────────────
// SkillStore
// ─────────────────────────────────────────────

/// Available and active skills.
pub struct SkillStore {
    dirs: Vec<PathBuf>,
    available: RwLock<BTreeMap<String, Skill>>,
    active: RwLock<BTreeMap<String, ActiveSkill>>,
}

impl SkillStore {
    /// Scan `dirs` for skills. Earlier directories win on name clashes.
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let available = discover(&dirs);
        info!(count = available.len(), "skills loaded");
        Self {
            dirs,
            available: RwLock::new(available),
            active: RwLock::new(BTreeMap::new()),
        }
    }

    /// A store with no skill directories.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn available(&self) -> RwLockReadGuard<'_, BTreeMap<String, Skill>> {
        self.available.read().unwrap_or_else(|e| e.into_inner())
    }

    fn active_read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ActiveSkill>> {
        self.active.read().unwrap_or_else(|e| e.into_inner())
    }

    fn active_write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ActiveSkill>> {
        self.active.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Directories this store scans.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Names of every available skill, alphabetically.
    pub fn list_available(&self) -> Vec<String> {
        self.available().keys().cloned().collect()
    }

    /// Full record for one skill.
    pub fn describe(&self, name: &str) -> Option<Skill> {
        self.available().get(name).cloned()
    }

    /// Mark a skill active for `task` and return the activation report.
    ///
    /// Re-activating an active skill replaces its task.
    pub fn activate(&self, name: &str, task: &str) -> String {
        let Some(skill) = self.describe(name) else {
            warn!(skill = name, "activation of unknown skill");
            return format!(
                "Error: Unknown skill '{name}'. Available skills: {}",
                self.list_available().join(", ")
            );
        };

        let mut msg = format!("\nSkill Activated: {name}\n");
        msg.push_str(&format!("Title: {}\n", skill.title));
        if !skill.description.is_empty() {
            msg.push_str(&format!(
                "Description: {}\n",
                truncate_string(&skill.description, 200, "...")
            ));
        }
        msg.push_str(&format!("Task: {task}\n"));
        msg.push_str(&format!("Documentation: {}\n", skill.path.display()));

        let resources = list_resources(&skill.path);
        if !resources.is_empty() {
            msg.push_str("\n=== Available Resource Files ===\n");
            msg.push_str("You can use the read_file tool to load these files as needed:\n\n");
            if !resources.references.is_empty() {
                msg.push_str("References:\n");
                for p in &resources.references {
                    msg.push_str(&format!("  - {}\n", p.display()));
                }
            }
            if !resources.assets.is_empty() {
                msg.push_str("\nAssets:\n");
                for p in &resources.assets {
                    msg.push_str(&format!("  - {}\n", p.display()));
                }
            }
        }
        msg.push_str(
            "\nThe skill is now active. You can reference its documentation for detailed usage.",
        );

        info!(skill = name, "skill activated");
        self.active_write().insert(
            name.to_string(),
            ActiveSkill {
                task: task.to_string(),
                skill,
            },
        );
        msg
    }

    /// Drop a skill from the active set. Returns `false` if it was not active.
    pub fn deactivate(&self, name: &str) -> bool {
        let removed = self.active_write().remove(name).is_some();
        if removed {
            info!(skill = name, "skill deactivated");
        }
        removed
    }

    /// Snapshot of the active skills, sorted by name.
    pub fn active(&self) -> BTreeMap<String, ActiveSkill> {
        self.active_read().clone()
    }

    /// Prompt block describing the active skills, or `""` when none are.
    pub fn get_active_context(&self) -> String {
        let active = self.active_read();
        if active.is_empty() {
            return String::new();
        }

        let mut ctx = String::from("\n=== Active Skills ===\n");
        for (name, entry) in active.iter() {
            let desc = if entry.skill.description.is_empty() {
                "N/A"
            } else {
                entry.skill.description.as_str()
            };
            ctx.push_str(&format!("\n{name} - {}:\n", entry.skill.title));
            ctx.push_str(&format!("  Description: {}\n", truncate_string(desc, 150, "...")));
            ctx.push_str(&format!("  Task: {}\n", entry.task));
            ctx.push_str(&format!("  Documentation: {}\n", entry.skill.path.display()));
        }
        ctx
    }

    /// Full text of a skill's `SKILL.md`, front matter included.
    pub fn get_skill_content(&self, name: &str) -> Option<String> {
        let path = self.available().get(name)?.path.clone();
        std::fs::read_to_string(path).ok()
    }

    /// Rescan the directories. Active entries are kept as they are.
    pub fn reload(&self) -> usize {
        let fresh = discover(&self.dirs);
        let count = fresh.len();
        *self.available.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        info!(count, "skills reloaded");
        count
    }
}

impl Default for SkillStore {
    fn default() -> Self {
        Self::empty()
    }
}

// ─────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────

fn discover(dirs: &[PathBuf]) -> BTreeMap<String, Skill> {
    let mut found = BTreeMap::new();
    for dir in dirs {
        let Ok(entries) = std::fs::read_dir(dir) else {
            debug!(dir = %dir.display(), "skills directory not readable, skipping");
            continue;
        };
        let mut subdirs: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        subdirs.sort();

        for subdir in subdirs {
            let skill_file = subdir.join("SKILL.md");
            if !skill_file.is_file() {
                continue;
            }
            match load_skill(&subdir, &skill_file) {
                Ok(skill) => {
                    if found.contains_key(&skill.name) {
                        debug!(name = %skill.name, path = %skill_file.display(), "skill shadowed by earlier directory");
                        continue;
                    }
                    debug!(name = %skill.name, "discovered skill");
                    found.insert(skill.name.clone(), skill);
                }
                Err(e) => {
                    warn!(path = %skill_file.display(), error = %e, "could not load skill");
                }
            }
        }
    }
    found
}

fn load_skill(dir: &Path, skill_file: &Path) -> std::io::Result<Skill> {
    let content = std::fs::read_to_string(skill_file)?;
    let (frontmatter, body) = parse_frontmatter(&content);

    let lookup = |key: &str| {
        frontmatter
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = lookup("name").filter(|n| !n.is_empty()).unwrap_or(dir_name);
    let description = lookup("description").unwrap_or_default();
    let title = body
        .lines()
        .find_map(|l| l.strip_prefix("# ").map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| name.clone());

    Ok(Skill {
        name,
        title,
        description,
        path: skill_file.to_path_buf(),
        preview: truncate_string(body, PREVIEW_CHARS, ""),
        frontmatter,
    })
}

/// Split `---` front matter into key/value pairs and the remaining body.
///
/// Values wrapped in double quotes have the quotes removed.
fn parse_frontmatter(content: &str) -> (Vec<(String, String)>, &str) {
    let Some(after_first) = content.strip_prefix("---") else {
        return (Vec::new(), content.trim());
    };
    let Some(end) = after_first.find("\n---") else {
        return (Vec::new(), content.trim());
    };
    let block = &after_first[..end];
    let body = after_first[end + 4..].trim();

    let mut pairs = Vec::new();
    for line in block.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            if !key.is_empty() {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
    }
    (pairs, body)
}

/// Markdown files under the skill's `references/` and `assets/`, each sorted.
fn list_resources(skill_file: &Path) -> SkillResources {
    let Some(dir) = skill_file.parent() else {
        return SkillResources::default();
    };
    let collect = |sub: &str| -> Vec<PathBuf> {
        let root = dir.join(sub);
        if !root.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort();
        files
    };
    SkillResources {
        references: collect("references"),
        assets: collect("assets"),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Create a skill directory with a SKILL.md file.
    fn create_skill(base: &Path, dir: &str, content: &str) -> PathBuf {
        let skill_dir = base.join(dir);
        fs::create_dir_all(&skill_dir).unwrap();
        fs::write(skill_dir.join("SKILL.md"), content).unwrap();
        skill_dir
    }

    fn pdf_skill(base: &Path) -> PathBuf {
        create_skill(
            base,
            "pdf",
            "---\nname: pdf\ndescription: \"Work with PDF files\"\n---\n\n# PDF Processing\n\nUse pdftotext.",
        )
    }

    // ────────────── Front matter ──────────────

    #[test]
    fn parse_frontmatter_valid() {
        let (fm, body) = parse_frontmatter("---\nname: github\ndescription: \"GitHub CLI\"\n---\n\n# Body");
        assert_eq!(fm.len(), 2);
        assert_eq!(fm[0], ("name".into(), "github".into()));
        assert_eq!(fm[1], ("description".into(), "GitHub CLI".into()));
        assert_eq!(body, "# Body");
    }

    #[test]
    fn parse_frontmatter_absent() {
        let (fm, body) = parse_frontmatter("# Just markdown\n");
        assert!(fm.is_empty());
        assert_eq!(body, "# Just markdown");
    }

    #[test]
    fn parse_frontmatter_value_with_colon() {
        let (fm, _) = parse_frontmatter("---\ndescription: Use it: carefully\n---\nx");
        assert_eq!(fm[0].1, "Use it: carefully");
    }

    // ────────────── Discovery ──────────────

    #[test]
    fn discovers_and_lists_alphabetically() {
        let tmp = TempDir::new().unwrap();
        create_skill(tmp.path(), "zeta", "# Zeta\n");
        pdf_skill(tmp.path());
        fs::create_dir_all(tmp.path().join("not-a-skill")).unwrap();

        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);
        assert_eq!(store.list_available(), vec!["pdf", "zeta"]);

        let pdf = store.describe("pdf").unwrap();
        assert_eq!(pdf.title, "PDF Processing");
        assert_eq!(pdf.description, "Work with PDF files");
        assert!(pdf.preview.starts_with("# PDF Processing"));

        // no front matter: directory name and heading
        let zeta = store.describe("zeta").unwrap();
        assert_eq!(zeta.name, "zeta");
        assert_eq!(zeta.title, "Zeta");
        assert!(zeta.description.is_empty());
    }

    #[test]
    fn frontmatter_name_overrides_directory() {
        let tmp = TempDir::new().unwrap();
        create_skill(tmp.path(), "dir-name", "---\nname: real-name\n---\nBody only");
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);
        let skill = store.describe("real-name").unwrap();
        assert_eq!(skill.title, "real-name");
        assert!(store.describe("dir-name").is_none());
    }

    #[test]
    fn earlier_directory_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        create_skill(first.path(), "pdf", "---\ndescription: first\n---\n");
        create_skill(second.path(), "pdf", "---\ndescription: second\n---\n");

        let store = SkillStore::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
        assert_eq!(store.describe("pdf").unwrap().description, "first");
    }

    #[test]
    fn missing_directory_is_empty() {
        let store = SkillStore::new(vec![PathBuf::from("/nonexistent/chatagent/skills")]);
        assert!(store.list_available().is_empty());
        assert_eq!(store.get_active_context(), "");
    }

    // ────────────── Activation ──────────────

    #[test]
    fn activate_unknown_skill_lists_available() {
        let tmp = TempDir::new().unwrap();
        pdf_skill(tmp.path());
        create_skill(tmp.path(), "xlsx", "# Sheets\n");
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);

        let msg = store.activate("docx", "write a letter");
        assert_eq!(msg, "Error: Unknown skill 'docx'. Available skills: pdf, xlsx");
        assert!(store.active().is_empty());
    }

    #[test]
    fn activate_reports_and_records() {
        let tmp = TempDir::new().unwrap();
        pdf_skill(tmp.path());
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);

        let msg = store.activate("pdf", "extract tables");
        assert!(msg.starts_with("\nSkill Activated: pdf\nTitle: PDF Processing\n"));
        assert!(msg.contains("Description: Work with PDF files\n"));
        assert!(msg.contains("Task: extract tables\n"));
        assert!(msg.contains("Documentation: "));
        assert!(!msg.contains("=== Available Resource Files ==="));
        assert!(msg.ends_with("You can reference its documentation for detailed usage."));

        let active = store.active();
        assert_eq!(active["pdf"].task, "extract tables");
    }

    #[test]
    fn activate_lists_resources_sorted() {
        let tmp = TempDir::new().unwrap();
        let dir = pdf_skill(tmp.path());
        fs::create_dir_all(dir.join("references").join("deep")).unwrap();
        fs::create_dir_all(dir.join("assets")).unwrap();
        fs::write(dir.join("references").join("b.md"), "b").unwrap();
        fs::write(dir.join("references").join("deep").join("a.md"), "a").unwrap();
        fs::write(dir.join("references").join("skip.txt"), "x").unwrap();
        fs::write(dir.join("assets").join("template.md"), "t").unwrap();

        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);
        let msg = store.activate("pdf", "t");

        assert!(msg.contains("=== Available Resource Files ==="));
        let b = msg.find("references/b.md").unwrap();
        let a = msg.find("references/deep/a.md").unwrap();
        assert!(b < a);
        assert!(msg.contains("\nAssets:\n"));
        assert!(msg.contains("assets/template.md"));
        assert!(!msg.contains("skip.txt"));
    }

    #[test]
    fn long_description_is_clipped() {
        let tmp = TempDir::new().unwrap();
        let long = "d".repeat(300);
        create_skill(tmp.path(), "big", &format!("---\ndescription: {long}\n---\n# Big"));
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);

        let msg = store.activate("big", "t");
        assert!(msg.contains(&format!("Description: {}...\n", "d".repeat(200))));

        let ctx = store.get_active_context();
        assert!(ctx.contains(&format!("  Description: {}...\n", "d".repeat(150))));
    }

    #[test]
    fn active_context_and_deactivate() {
        let tmp = TempDir::new().unwrap();
        pdf_skill(tmp.path());
        create_skill(tmp.path(), "alpha", "# Alpha\n");
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);

        store.activate("pdf", "read invoices");
        store.activate("alpha", "first");

        let ctx = store.get_active_context();
        assert!(ctx.starts_with("\n=== Active Skills ===\n"));
        assert!(ctx.contains("\npdf - PDF Processing:\n  Description: Work with PDF files\n  Task: read invoices\n"));
        assert!(ctx.contains("\nalpha - Alpha:\n  Description: N/A\n"));
        // sorted by name
        assert!(ctx.find("alpha -").unwrap() < ctx.find("pdf -").unwrap());

        assert!(store.deactivate("pdf"));
        assert!(!store.deactivate("pdf"));
        assert!(!store.get_active_context().contains("pdf -"));
    }

    #[test]
    fn reload_picks_up_new_skills_and_keeps_active() {
        let tmp = TempDir::new().unwrap();
        pdf_skill(tmp.path());
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);
        store.activate("pdf", "t");

        create_skill(tmp.path(), "new", "# New\n");
        assert_eq!(store.reload(), 2);
        assert_eq!(store.list_available(), vec!["new", "pdf"]);
        assert!(store.active().contains_key("pdf"));
    }

    #[test]
    fn skill_content_is_full_file() {
        let tmp = TempDir::new().unwrap();
        pdf_skill(tmp.path());
        let store = SkillStore::new(vec![tmp.path().to_path_buf()]);
        let content = store.get_skill_content("pdf").unwrap();
        assert!(content.starts_with("---\nname: pdf"));
        assert!(store.get_skill_content("nope").is_none());
    }
}
