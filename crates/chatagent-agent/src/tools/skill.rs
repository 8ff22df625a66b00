//! Skill activation tool — the model's handle on the [`SkillStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{require_string, Tool};
use crate::skills::SkillStore;

/// Activates a skill so its context joins the next system prompt.
pub struct ActivateSkillTool {
    skills: Arc<SkillStore>,
}

impl ActivateSkillTool {
    pub fn new(skills: Arc<SkillStore>) -> Self {
        Self { skills }
    }
}

#[async_trait]
impl Tool for ActivateSkillTool {
    fn name(&self) -> &str {
        "activate_skill"
    }

    fn description(&self) -> &str {
        "Activate a skill for specialized tasks. Skills provide enhanced capabilities for specific domains like PDF handling, spreadsheets, presentations, etc."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "skill_name": {
                    "type": "string",
                    "description": "Name of the skill to activate (e.g., 'pdf', 'xlsx', 'pptx')"
                },
                "task_description": {
                    "type": "string",
                    "description": "Description of the task to perform with this skill"
                }
            },
            "required": ["skill_name", "task_description"]
        })
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let skill_name = require_string(&params, "skill_name")?;
        let task = require_string(&params, "task_description")?;
        Ok(self.skills.activate(&skill_name, &task))
    }
}
