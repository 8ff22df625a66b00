//! ChatAgent Agent — orchestration loop, tools, skills and context builder.
//!
//! This crate contains:
//! - **tools**: Tool trait, registry, and built-in tools (filesystem, search, shell, web, memory, skills)
//! - **confirm**: the confirmation gate consulted before sensitive tools run
//! - **skills**: skill discovery and the active-skill set
//! - **context**: System prompt and message list construction
//! - **agent_loop**: The model ↔ tool-calling main loop

pub mod agent_loop;
pub mod confirm;
pub mod context;
pub mod memory;
pub mod skills;
pub mod tools;

pub use agent_loop::{AgentLoop, DEFAULT_MAX_ITERATIONS, MAX_ITERATIONS_FALLBACK};
pub use confirm::{denial_message, AllowAll, ConfirmationGate, DenyAll, FnGate};
pub use context::ContextBuilder;
pub use memory::{MemoryEntry, MemoryStore, SaveOutcome};
pub use skills::{ActiveSkill, Skill, SkillStore};
pub use tools::{default_registry, Tool, ToolError, ToolRegistry};
