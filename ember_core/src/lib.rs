#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod tools;

pub use tools::{Tool, ToolRegistry};

/// Role of a conversational turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }

    /// Parse a stored role string. Unknown strings return `None` so callers
    /// can skip rows written by newer schema revisions.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// A tool invocation requested by the completion gateway.
///
/// Mirrors the OpenAI wire shape so message sequences serialize directly
/// into the chat-completions payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFunction {
    pub name: String,
    /// JSON-encoded argument payload, exactly as returned by the gateway.
    pub arguments: String,
}

impl ToolCall {
    #[must_use]
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "function".to_string(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// One conversational turn. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Present on assistant messages that request tool invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Present on tool messages; links the result back to the call it answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message carrying a tool-invocation request.
    #[must_use]
    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    /// Tool-role message answering the call with the given id.
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// Outcome of one completion request: either final text (`tool_calls`
/// empty) or one or more tool-invocation requests.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A long-term fact about the user, injected into future system prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryFact {
    pub id: Uuid,
    pub memory: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// A persisted conversation row, as reloaded from the message log.
#[derive(Debug, Clone)]
pub struct StoredTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Opaque completion capability: given a message sequence and an optional
/// tool catalog, produce either final text or tool-invocation requests.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// `tools` is the OpenAI-style function catalog; empty means the
    /// gateway must answer in natural language.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
        model: &str,
    ) -> anyhow::Result<Completion>;

    fn default_model(&self) -> &str;
}

/// Durable append-only log of conversation turns.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, session_id: &str, role: Role, content: &str) -> anyhow::Result<()>;

    /// Full history for a session, ordered by creation time ascending.
    async fn history(&self, session_id: &str) -> anyhow::Result<Vec<StoredTurn>>;
}

/// Durable store of long-term memory facts. Append and read only; facts are
/// never edited or deleted by this subsystem.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn insert(&self, memory: &str, embedding: &[f32]) -> anyhow::Result<MemoryFact>;

    /// Most recent facts, newest first.
    async fn recent(&self, limit: u64) -> anyhow::Result<Vec<MemoryFact>>;
}

/// Pluggable embedding capability. The default implementation emits a
/// fixed-length zero vector; similarity search is intentionally deferred.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::System, Role::User, Role::Assistant, Role::Tool] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("narrator"), None);
    }

    #[test]
    fn chat_message_serializes_to_wire_shape() {
        let msg = ChatMessage::new(Role::User, "hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "hi"}));

        let req = ChatMessage::tool_request(
            String::new(),
            vec![ToolCall::function("call_1", "save_memory", r#"{"memory":"x"}"#)],
        );
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "save_memory");

        let result = ChatMessage::tool_result("call_1", "done");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
    }
}
