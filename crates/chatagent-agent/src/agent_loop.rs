//! Agent loop — the model ↔ tool-calling orchestration loop.
//!
//! One user turn:
//! 1. append the user message to history;
//! 2. rebuild the system prompt and send it with the history and tool schemas;
//! 3. plain answer → append it and return;
//! 4. tool calls → run them one at a time, in order, through the
//!    confirmation gate where required, then commit the assistant message
//!    and every result to history together and go back to 2;
//! 5. after `max_iterations` model calls, return the text of the final
//!    model response or a fixed fallback.
//!
//! Backend errors abort the turn. Tool failures, unknown tools, bad
//! arguments and refusals never do: they come back as tool-result text.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use chatagent_core::config::Config;
use chatagent_core::types::{Message, ToolCall};
use chatagent_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::confirm::{denial_message, ConfirmationGate, DenyAll};
use crate::context::ContextBuilder;
use crate::memory::MemoryStore;
use crate::skills::SkillStore;
use crate::tools::error::ToolError;
use crate::tools::registry::ToolRegistry;

/// Default maximum model calls per user turn.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Returned when the cap is hit and the final model response had no text.
pub const MAX_ITERATIONS_FALLBACK: &str = "Maximum tool call iterations reached.";

/// Models offered by `/model`.
const AVAILABLE_MODELS: &[&str] = &[
    // Claude
    "claude-opus-4",
    "claude-sonnet-4-5",
    "claude-sonnet-4",
    "claude-haiku-4",
    // OpenAI
    "gpt-4-turbo-preview",
    "gpt-4-turbo",
    "gpt-4",
    "gpt-4-32k",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    // Other
    "deepseek-chat",
    "deepseek-coder",
];

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// Owns the conversation and drives the model ↔ tool cycle.
pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    model: String,
    request_config: LlmRequestConfig,
    max_iterations: u32,
    tools: ToolRegistry,
    context: ContextBuilder,
    memory: Arc<MemoryStore>,
    gate: Option<Arc<dyn ConfirmationGate>>,
    history: Vec<Message>,
}

impl AgentLoop {
    /// Create a loop using the provider's default model and no gate.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        context: ContextBuilder,
        memory: Arc<MemoryStore>,
    ) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider,
            model,
            request_config: LlmRequestConfig::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tools,
            context,
            memory,
            gate: None,
            history: Vec::new(),
        }
    }

    /// Apply the `agent` section of the config (builder pattern).
    pub fn with_config(self, config: &Config) -> Self {
        self.with_model(config.agent.model.clone())
            .with_max_iterations(config.agent.max_tool_iterations)
            .with_request_config(LlmRequestConfig {
                max_tokens: config.agent.max_tokens,
                temperature: config.agent.temperature,
            })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_request_config(mut self, request_config: LlmRequestConfig) -> Self {
        self.request_config = request_config;
        self
    }

    pub fn with_confirmation_gate(mut self, gate: Arc<dyn ConfirmationGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    // ────────────── The loop ──────────────

    /// Run one user turn to completion and return the assistant's answer.
    pub async fn chat(&mut self, text: &str) -> Result<String> {
        self.history.push(Message::user(text));

        let tool_defs = self.tools.describe_all();
        let tools = (!tool_defs.is_empty()).then_some(tool_defs.as_slice());
        let mut final_text: Option<String> = None;

        for iteration in 1..=self.max_iterations {
            debug!(iteration, max = self.max_iterations, "model call");

            let messages = self.context.build_messages(&self.history);
            let response = self
                .provider
                .chat(&messages, tools, &self.model, &self.request_config)
                .await?;

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                info!(iteration, "final response");
                self.history.push(Message::assistant(content.clone()));
                return Ok(content);
            }

            info!(iteration, calls = response.tool_calls.len(), "processing tool calls");
            final_text = response
                .content
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string);

            // Built locally and committed whole, so a dropped turn never
            // leaves an assistant message without all of its results.
            let mut batch = Vec::with_capacity(response.tool_calls.len() + 1);
            batch.push(Message::assistant_with_tool_calls(
                response.content,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.run_tool_call(call).await;
                debug!(tool = %call.function.name, result_len = result.len(), "tool result");
                batch.push(Message::tool_result(&call.id, &call.function.name, result));
            }
            self.history.extend(batch);
        }

        warn!(max = self.max_iterations, "maximum tool call iterations reached");
        let content = final_text.unwrap_or_else(|| MAX_ITERATIONS_FALLBACK.to_string());
        self.history.push(Message::assistant(content.clone()));
        Ok(content)
    }

    /// Resolve, confirm and execute a single call. Always yields result text.
    async fn run_tool_call(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();

        let tool = match self.tools.get(name) {
            Ok(tool) => Arc::clone(tool),
            Err(e) => {
                warn!(tool = name, "model requested unknown tool");
                return e.to_result_string();
            }
        };

        let args = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = name, error = %e, "unparseable tool arguments");
                return ToolError::InvalidArguments {
                    name: name.to_string(),
                    reason: e.to_string(),
                }
                .to_result_string();
            }
        };

        if tool.requires_confirmation() {
            let approved = match &self.gate {
                Some(gate) => gate.confirm(name, tool.description(), &args).await,
                None => DenyAll.confirm(name, tool.description(), &args).await,
            };
            if !approved {
                info!(tool = name, "tool call denied");
                return denial_message(name);
            }
        }

        info!(tool = name, "executing tool call");
        ToolRegistry::invoke(tool.as_ref(), args).await
    }

    // ────────────── Session controls ──────────────

    /// Drop the whole conversation. Active skills are left alone.
    pub fn clear_history(&mut self) {
        info!(messages = self.history.len(), "history cleared");
        self.history.clear();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch model for subsequent calls.
    pub fn set_model(&mut self, model: &str) -> String {
        let old = std::mem::replace(&mut self.model, model.to_string());
        info!(from = %old, to = %model, "model changed");
        format!("Model changed from {old} to {model}")
    }

    pub fn list_available_models(&self) -> &'static [&'static str] {
        AVAILABLE_MODELS
    }

    /// Short report for `/status`.
    pub fn conversation_summary(&self) -> String {
        if self.history.is_empty() {
            return "No conversation history".to_string();
        }
        let active = self.skills().active();
        let mut summary = format!(
            "Total messages: {}\nCurrent model: {}\nActive skills: {}\n",
            self.history.len(),
            self.model,
            active.len()
        );
        if !active.is_empty() {
            let names: Vec<&str> = active.keys().map(String::as_str).collect();
            summary.push_str(&format!("Active: {}", names.join(", ")));
        }
        summary
    }

    pub fn skills(&self) -> &Arc<SkillStore> {
        self.context.skills()
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn provider_name(&self) -> &str {
        self.provider.display_name()
    }

    /// Replace (or remove, with `None`) the confirmation gate.
    pub fn set_confirmation_gate(&mut self, gate: Option<Arc<dyn ConfirmationGate>>) {
        self.gate = gate;
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
