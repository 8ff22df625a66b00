//! Confirmation gate — the approval step in front of sensitive tools.
//!
//! The agent loop consults a gate once per call to a tool whose
//! `requires_confirmation()` is true, and only for those. From the loop's
//! side the answer is a plain `bool`; session-wide "approve all" and
//! prompt cancellation are the gate's own business.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Decides whether a sensitive tool call may run.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Return `true` to run the call. Any cancellation must resolve to `false`.
    async fn confirm(
        &self,
        tool_name: &str,
        description: &str,
        args: &HashMap<String, Value>,
    ) -> bool;
}

/// Tool-result text used when a call is refused.
pub fn denial_message(tool_name: &str) -> String {
    format!("Tool execution denied by user: '{tool_name}' was not run.")
}

// ─────────────────────────────────────────────
// Provided gates
// ─────────────────────────────────────────────

/// Refuses everything. Used when no gate is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

#[async_trait]
impl ConfirmationGate for DenyAll {
    async fn confirm(&self, _: &str, _: &str, _: &HashMap<String, Value>) -> bool {
        false
    }
}

/// Approves everything (`--yes`, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl ConfirmationGate for AllowAll {
    async fn confirm(&self, _: &str, _: &str, _: &HashMap<String, Value>) -> bool {
        true
    }
}

/// Wraps a synchronous closure as a gate.
pub struct FnGate<F>(pub F);

#[async_trait]
impl<F> ConfirmationGate for FnGate<F>
where
    F: Fn(&str, &str, &HashMap<String, Value>) -> bool + Send + Sync,
{
    async fn confirm(
        &self,
        tool_name: &str,
        description: &str,
        args: &HashMap<String, Value>,
    ) -> bool {
        (self.0)(tool_name, description, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fixed_gates() {
        let args = HashMap::new();
        assert!(!DenyAll.confirm("write_file", "d", &args).await);
        assert!(AllowAll.confirm("write_file", "d", &args).await);
    }

    #[tokio::test]
    async fn test_fn_gate_sees_arguments() {
        let gate = FnGate(|name: &str, _: &str, args: &HashMap<String, Value>| {
            name == "run_shell_command" && args.get("command") == Some(&json!("ls"))
        });

        let mut args = HashMap::new();
        args.insert("command".to_string(), json!("ls"));
        assert!(gate.confirm("run_shell_command", "", &args).await);

        args.insert("command".to_string(), json!("rm -rf x"));
        assert!(!gate.confirm("run_shell_command", "", &args).await);
    }

    #[test]
    fn test_denial_message_names_tool() {
        let msg = denial_message("write_file");
        assert!(msg.contains("'write_file'"));
        assert!(msg.contains("denied"));
    }
}
