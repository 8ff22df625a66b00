//! Tool Registry — name-keyed store of the agent's tools.
//!
//! The agent loop registers tools here, sends `describe_all()` to the model,
//! and resolves tool-call requests by name.

use std::collections::HashMap;
use std::sync::Arc;

use chatagent_core::types::ToolDefinition;
use serde_json::Value;
use tracing::{info, warn};

use super::base::{Tool, ToolDescriptor};
use super::error::ToolError;

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Stores tools keyed by name, remembering registration order.
///
/// Owns `Arc<dyn Tool>` so tools can be shared across threads.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Last write wins: a tool with an existing name
    /// replaces the old one in its original slot.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                warn!(tool = %name, "replacing previously registered tool");
                self.tools[slot] = tool;
            }
            None => {
                info!(tool = %name, "registered tool");
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Unregister a tool by name. Returns the removed tool, if any.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let slot = self.index.remove(name)?;
        let removed = self.tools.remove(slot);
        for idx in self.index.values_mut() {
            if *idx > slot {
                *idx -= 1;
            }
        }
        info!(tool = name, "unregistered tool");
        Some(removed)
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Tool>, ToolError> {
        self.index
            .get(name)
            .map(|&slot| &self.tools[slot])
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registered tools, in registration order.
    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Names of all registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Descriptors for every tool, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    /// The LLM-facing schema for all registered tools.
    pub fn describe_all(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Run an already-resolved tool.
    ///
    /// The LLM always gets a `String` back, even on failure.
    pub async fn invoke(tool: &dyn Tool, params: HashMap<String, Value>) -> String {
        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = tool.name(), error = %e, "tool execution failed");
                format!("Error executing {}: {e}", tool.name())
            }
        }
    }

    /// Resolve and run a tool by name, with no confirmation step.
    pub async fn execute(&self, name: &str, params: HashMap<String, Value>) -> String {
        match self.get(name) {
            Ok(tool) => Self::invoke(tool.as_ref(), params).await,
            Err(e) => {
                warn!(tool = name, "tool not found");
                e.to_result_string()
            }
        }
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
