//! One conversational turn, end to end.

use ember_core::{ChatMessage, Completion, CompletionGateway, Role, ToolCall, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::Session;

/// Errors fatal to a single turn. The session and its stream stay usable.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("completion gateway error: {0}")]
    Gateway(#[source] anyhow::Error),

    #[error("completion gateway returned an empty reply")]
    EmptyResponse,

    #[error("completion did not finish within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Model override; `None` uses the gateway default.
    pub model: Option<String>,
    /// Optional deadline applied to each gateway call.
    pub turn_timeout: Option<Duration>,
}

/// Drives the turn state machine:
///
/// `AppendUser -> RequestCompletion -> Done`, or
/// `AppendUser -> RequestCompletion -> ExecuteTools -> RequestFollowup -> Done`.
///
/// Every appended `user`/`assistant` message is persisted best effort; the
/// transient tool exchange stays in memory only. Tool failures become
/// tool-result messages and never fail the turn; gateway failures do.
pub struct TurnOrchestrator {
    gateway: Arc<dyn CompletionGateway>,
    messages: Arc<dyn ember_core::MessageStore>,
    tools: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        messages: Arc<dyn ember_core::MessageStore>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            gateway,
            messages,
            tools,
            config: OrchestratorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute exactly one turn and return the assistant's final text.
    pub async fn run_turn(&self, session: &mut Session, text: &str) -> Result<String, TurnError> {
        info!("Processing turn for session: {}", session.id);

        session.push(ChatMessage::new(Role::User, text));
        self.persist(&session.id, Role::User, text).await;

        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| self.gateway.default_model().to_string());
        let catalog = self.tools.definitions();

        let completion = self.request(&session.messages, &catalog, &model).await?;

        let final_text = if completion.tool_calls.is_empty() {
            completion.content
        } else {
            self.execute_tool_phase(session, completion).await;
            // Second call with no catalog forces a natural-language answer.
            self.request(&session.messages, &[], &model).await?.content
        };

        if final_text.trim().is_empty() {
            return Err(TurnError::EmptyResponse);
        }

        session.push(ChatMessage::new(Role::Assistant, final_text.clone()));
        self.persist(&session.id, Role::Assistant, &final_text).await;
        session.touch();

        debug!("Turn completed for session: {}", session.id);
        Ok(final_text)
    }

    /// Append the tool-call request and one result message per call, in
    /// gateway order. A failing call produces an error description and the
    /// remaining calls still run.
    async fn execute_tool_phase(&self, session: &mut Session, completion: Completion) {
        let calls = completion.tool_calls;
        info!(
            "Gateway requested {} tool call(s) for session {}",
            calls.len(),
            session.id
        );

        session.push(ChatMessage::tool_request(completion.content, calls.clone()));

        for call in calls {
            let result = self.execute_call(&call).await;
            session.push(ChatMessage::tool_result(call.id, result));
        }
    }

    async fn execute_call(&self, call: &ToolCall) -> String {
        let name = &call.function.name;
        info!("Executing tool: {name} (call {})", call.id);

        let args: serde_json::Value = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!("Malformed arguments for tool {name}: {e}");
                return format!("Error decoding arguments for {name}: {e}");
            }
        };

        match self.tools.execute(name, args).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool {name} failed: {e}");
                format!("Error executing {name}: {e}")
            }
        }
    }

    async fn request(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
        model: &str,
    ) -> Result<Completion, TurnError> {
        let call = self.gateway.complete(messages, tools, model);
        match self.config.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TurnError::Timeout(limit))?
                .map_err(TurnError::Gateway),
            None => call.await.map_err(TurnError::Gateway),
        }
    }

    async fn persist(&self, session_id: &str, role: Role, content: &str) {
        if let Err(e) = self.messages.append(session_id, role, content).await {
            warn!(
                "Failed to persist {} message for {session_id}: {e}",
                role.as_str()
            );
        }
    }
}
