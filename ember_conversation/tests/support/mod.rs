//! In-memory doubles for the store and gateway traits.

#![allow(clippy::unwrap_used, dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use ember_core::{
    ChatMessage, Completion, CompletionGateway, MemoryFact, MemoryStore, MessageStore, Role,
    StoredTurn, ToolCall,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub enum Script {
    Reply(Completion),
    Fail(&'static str),
}

pub fn text_reply(text: &str) -> Script {
    Script::Reply(Completion {
        content: text.to_string(),
        tool_calls: Vec::new(),
        usage: None,
    })
}

pub fn tool_reply(calls: Vec<ToolCall>) -> Script {
    Script::Reply(Completion {
        content: String::new(),
        tool_calls: calls,
        usage: None,
    })
}

/// What the gateway saw for one completion request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub roles: Vec<Role>,
    pub tool_count: usize,
}

/// Gateway double replaying a fixed script of replies.
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Script>>,
    pub requests: Mutex<Vec<SeenRequest>>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionGateway for ScriptedGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
        _model: &str,
    ) -> anyhow::Result<Completion> {
        self.requests.lock().unwrap().push(SeenRequest {
            roles: messages.iter().map(|m| m.role).collect(),
            tool_count: tools.len(),
        });

        match self.script.lock().unwrap().pop_front() {
            Some(Script::Reply(completion)) => Ok(completion),
            Some(Script::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            None => Err(anyhow::anyhow!("gateway script exhausted")),
        }
    }

    fn default_model(&self) -> &str {
        "test-model"
    }
}

/// Message-log double with switchable read/write failures.
pub struct MemLog {
    rows: Mutex<Vec<(String, Role, String)>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemLog {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Pre-populate history, bypassing the failure switches.
    pub fn seed(&self, session_id: &str, role: Role, content: &str) {
        self.rows
            .lock()
            .unwrap()
            .push((session_id.to_string(), role, content.to_string()));
    }

    pub fn rows_for(&self, session_id: &str) -> Vec<(Role, String)> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| id == session_id)
            .map(|(_, role, content)| (*role, content.clone()))
            .collect()
    }
}

#[async_trait]
impl MessageStore for MemLog {
    async fn append(&self, session_id: &str, role: Role, content: &str) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("message store write refused");
        }
        self.seed(session_id, role, content);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> anyhow::Result<Vec<StoredTurn>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("message store read refused");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _, _)| id == session_id)
            .map(|(_, role, content)| StoredTurn {
                role: *role,
                content: content.clone(),
                created_at: Utc::now(),
            })
            .collect())
    }
}

/// Memory-fact store double.
pub struct MemFacts {
    facts: Mutex<Vec<MemoryFact>>,
    pub fail: AtomicBool,
}

impl MemFacts {
    pub fn new() -> Self {
        Self {
            facts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn with_facts(facts: &[&str]) -> Self {
        let store = Self::new();
        for text in facts {
            store.facts.lock().unwrap().push(MemoryFact {
                id: Uuid::now_v7(),
                memory: (*text).to_string(),
                embedding: Vec::new(),
                created_at: Utc::now(),
            });
        }
        store
    }

    pub fn count(&self) -> usize {
        self.facts.lock().unwrap().len()
    }
}

#[async_trait]
impl MemoryStore for MemFacts {
    async fn insert(&self, memory: &str, embedding: &[f32]) -> anyhow::Result<MemoryFact> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("memory store refused");
        }
        let fact = MemoryFact {
            id: Uuid::now_v7(),
            memory: memory.to_string(),
            embedding: embedding.to_vec(),
            created_at: Utc::now(),
        };
        self.facts.lock().unwrap().push(fact.clone());
        Ok(fact)
    }

    async fn recent(&self, limit: u64) -> anyhow::Result<Vec<MemoryFact>> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("memory store refused");
        }
        let facts = self.facts.lock().unwrap();
        Ok(facts
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}
