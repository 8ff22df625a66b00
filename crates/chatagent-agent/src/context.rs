//! Context builder — constructs the system prompt and the message list sent
//! to the model.
//!
//! The prompt is rebuilt before every model call so that a skill activated
//! by a tool in the previous batch shows up immediately.

use std::path::Path;
use std::sync::Arc;

use chatagent_core::types::Message;
use chatagent_core::utils::now_with_weekday;
use tracing::debug;

use crate::skills::SkillStore;

/// Project instruction file picked up from the working directory.
pub const PROJECT_INSTRUCTIONS_FILE: &str = "CHATAGENT.md";

const IDENTITY: &str = "\
You are ChatAgent, a helpful AI assistant with access to various tools and skills.

You can help users with:
- Reading, writing, and editing files
- Searching for files and text content
- Executing shell commands
- Fetching web content and searching the web
- Saving important information to memory
- Activating specialized skills for specific tasks
- Investigating codebases and project structures

When users ask you to do something:
1. Think about which tools would be helpful
2. Use the appropriate tools to complete the task
3. Provide clear and concise responses
4. If you need more information, ask the user

Be proactive in using tools when they would be helpful. For example:
- If asked about a file, use read_file to view it
- If asked to search for something in code, use search_file_content
- If asked to create or modify files, use write_file or replace
- If asked to fetch web content, use web_fetch
- For specialized tasks, check if there's an appropriate skill to activate

Always be helpful, accurate, and efficient.";

// ─────────────────────────────────────────────
// Context builder
// ─────────────────────────────────────────────

/// Builds system prompts and conversation message lists for the agent loop.
pub struct ContextBuilder {
    skills: Arc<SkillStore>,
    project_instructions: Option<String>,
}

impl ContextBuilder {
    pub fn new(skills: Arc<SkillStore>) -> Self {
        Self {
            skills,
            project_instructions: None,
        }
    }

    /// Attach project instructions (builder pattern).
    pub fn with_project_instructions(mut self, instructions: Option<String>) -> Self {
        self.project_instructions = instructions.filter(|s| !s.trim().is_empty());
        self
    }

    /// Read `CHATAGENT.md` from `dir`, if present.
    pub fn load_project_instructions(dir: &Path) -> Option<String> {
        let path = dir.join(PROJECT_INSTRUCTIONS_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        debug!(file = %path.display(), chars = content.len(), "loaded project instructions");
        Some(content)
    }

    /// The shared skill store.
    pub fn skills(&self) -> &Arc<SkillStore> {
        &self.skills
    }

    pub fn project_instructions(&self) -> Option<&str> {
        self.project_instructions.as_deref()
    }

    // ────────────── System prompt ──────────────

    /// Build the full system prompt from the current skill state.
    pub fn build_system_prompt(&self) -> String {
        let mut prompt = String::from(IDENTITY);
        prompt.push_str(&format!("\n\nCurrent Date and Time: {}", now_with_weekday()));

        if let Some(instructions) = &self.project_instructions {
            prompt.push_str("\n\n=== Project Instructions ===\n");
            prompt.push_str(instructions.trim());
        }

        let available = self.skills.list_available();
        if !available.is_empty() {
            prompt.push_str("\n\n=== Available Skills ===\n");
            prompt.push_str(
                "You have access to specialized skills. Use the 'activate_skill' tool to activate them when needed.\n\n",
            );
            for name in &available {
                let desc = self
                    .skills
                    .describe(name)
                    .map(|s| s.description)
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| "No description available".into());
                prompt.push_str(&format!("• {name}: {desc}\n"));
            }
            prompt.push_str(
                "\nWhen the user's request matches a skill's description, use the activate_skill tool before proceeding with the task.",
            );
        }

        let active = self.skills.get_active_context();
        if !active.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&active);
        }

        prompt
    }

    /// Fresh system message followed by the conversation history.
    pub fn build_messages(&self, history: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.build_system_prompt()));
        messages.extend_from_slice(history);
        messages
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

    fn store_with_skills() -> (TempDir, Arc<SkillStore>) {
        let tmp = TempDir::new().unwrap();
        for (dir, body) in [
            ("xlsx", "---\ndescription: Spreadsheets\n---\n# Excel"),
            ("pdf", "---\ndescription: PDF files\n---\n# PDF"),
            ("bare", "# Bare"),
        ] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
            fs::write(tmp.path().join(dir).join("SKILL.md"), body).unwrap();
        }
        let store = Arc::new(SkillStore::new(vec![tmp.path().to_path_buf()]));
        (tmp, store)
    }

    #[test]
    fn prompt_has_identity_and_date() {
        let ctx = ContextBuilder::new(Arc::new(SkillStore::empty()));
        let prompt = ctx.build_system_prompt();
        assert!(prompt.starts_with("You are ChatAgent"));
        assert!(prompt.contains("Current Date and Time:"));

        let now = chrono::Local::now();
        assert!(prompt.contains(&now.format("%Y").to_string()));
        assert!(prompt.contains(&now.format("%A").to_string()));

        assert!(!prompt.contains("=== Available Skills ==="));
        assert!(!prompt.contains("=== Active Skills ==="));
        assert!(!prompt.contains("=== Project Instructions ==="));
    }

    #[test]
    fn prompt_lists_skills_sorted() {
        let (_tmp, store) = store_with_skills();
        let prompt = ContextBuilder::new(store).build_system_prompt();

        assert!(prompt.contains("=== Available Skills ==="));
        assert!(prompt.contains("• pdf: PDF files\n"));
        assert!(prompt.contains("• bare: No description available\n"));
        let bare = prompt.find("• bare").unwrap();
        let pdf = prompt.find("• pdf").unwrap();
        let xlsx = prompt.find("• xlsx").unwrap();
        assert!(bare < pdf && pdf < xlsx);
        assert!(prompt.contains("use the activate_skill tool before proceeding"));
    }

    #[test]
    fn prompt_reflects_activation_on_rebuild() {
        let (_tmp, store) = store_with_skills();
        let ctx = ContextBuilder::new(store.clone());
        assert!(!ctx.build_system_prompt().contains("=== Active Skills ==="));

        store.activate("pdf", "summarize report");
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("=== Active Skills ==="));
        assert!(prompt.contains("pdf - PDF:"));
        assert!(prompt.contains("Task: summarize report"));

        store.deactivate("pdf");
        assert!(!ctx.build_system_prompt().contains("=== Active Skills ==="));
    }

    #[test]
    fn project_instructions_loaded_from_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(ContextBuilder::load_project_instructions(tmp.path()).is_none());

        fs::write(
            tmp.path().join(PROJECT_INSTRUCTIONS_FILE),
            "# Project Rules\nUse tabs.\n",
        )
        .unwrap();
        let loaded = ContextBuilder::load_project_instructions(tmp.path());
        let ctx = ContextBuilder::new(Arc::new(SkillStore::empty())).with_project_instructions(loaded);
        let prompt = ctx.build_system_prompt();
        assert!(prompt.contains("=== Project Instructions ===\n# Project Rules\nUse tabs."));
    }

    #[test]
    fn blank_project_instructions_ignored() {
        let ctx = ContextBuilder::new(Arc::new(SkillStore::empty()))
            .with_project_instructions(Some("  \n".into()));
        assert!(ctx.project_instructions().is_none());
    }

    #[test]
    fn build_messages_prepends_system() {
        let ctx = ContextBuilder::new(Arc::new(SkillStore::empty()));
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let messages = ctx.build_messages(&history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role(), "system");
        assert_eq!(messages[1].content(), Some("hi"));
    }
}
