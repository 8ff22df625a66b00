//! Tool modules for the ChatAgent agent.

pub mod base;
pub mod error;
pub mod filesystem;
pub mod help;
pub mod memory;
pub mod registry;
pub mod search;
pub mod shell;
pub mod skill;
pub mod web;

use std::path::PathBuf;
use std::sync::Arc;

use chatagent_core::config::Config;

pub use base::{
    optional_bool, optional_i64, optional_string, optional_string_list, require_string, Tool,
    ToolDescriptor,
};
pub use error::ToolError;
pub use registry::ToolRegistry;

use crate::memory::MemoryStore;
use crate::skills::SkillStore;

/// Build the standard tool set in its fixed registration order.
///
/// `working_dir` is where shell commands run. When
/// `tools.restrictToWorkspace` is set it is also the fence for file tools.
pub fn default_registry(
    config: &Config,
    working_dir: PathBuf,
    skills: Arc<SkillStore>,
    memory: Arc<MemoryStore>,
) -> ToolRegistry {
    let restrict = config.tools.restrict_to_workspace;
    let allowed_dir = restrict.then(|| working_dir.clone());

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(filesystem::ReadFileTool::new(allowed_dir.clone())));
    tools.register(Arc::new(filesystem::WriteFileTool::new(allowed_dir.clone())));
    tools.register(Arc::new(filesystem::ReplaceTool::new(allowed_dir.clone())));
    tools.register(Arc::new(filesystem::ListDirectoryTool::new(allowed_dir.clone())));
    tools.register(Arc::new(search::GlobTool::new(allowed_dir.clone())));
    tools.register(Arc::new(search::SearchFileContentTool::new(allowed_dir.clone())));
    tools.register(Arc::new(shell::RunShellCommandTool::new(
        working_dir,
        Some(config.tools.exec.timeout),
        restrict,
    )));
    tools.register(Arc::new(web::WebFetchTool::new(config.tools.web.fetch.max_chars)));
    tools.register(Arc::new(web::WebSearchTool::new(
        config.tools.web.search.max_results as usize,
    )));
    tools.register(Arc::new(memory::SaveMemoryTool::new(memory)));
    tools.register(Arc::new(help::CliHelpTool));
    tools.register(Arc::new(help::CodebaseInvestigatorTool::new(allowed_dir)));
    tools.register(Arc::new(skill::ActivateSkillTool::new(skills)));
    tools
}
