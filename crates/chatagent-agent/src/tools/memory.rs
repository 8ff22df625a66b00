//! Memory tool — lets the model persist facts through [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{optional_string_list, require_string, Tool};
use crate::memory::{MemoryStore, SaveOutcome};

/// Saves a key/value fact with optional tags.
pub struct SaveMemoryTool {
    store: Arc<MemoryStore>,
}

impl SaveMemoryTool {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "save_memory"
    }

    fn description(&self) -> &str {
        "Save important information to memory for future reference. Use this to remember user preferences, project context, or important facts."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "A short key or identifier for this memory"
                },
                "value": {
                    "type": "string",
                    "description": "The information to remember"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional tags to categorize this memory"
                }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let key = require_string(&params, "key")?;
        let value = require_string(&params, "value")?;
        let tags = optional_string_list(&params, "tags");

        let outcome = self.store.save(&key, &value, tags)?;
        Ok(match outcome {
            SaveOutcome::Saved => format!("Saved memory: {key}"),
            SaveOutcome::Updated => format!("Updated memory: {key}"),
        })
    }
}
