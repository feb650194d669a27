use async_trait::async_trait;
use ember_core::{Embedder, MemoryStore, Tool};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SaveMemoryArgs {
    memory: String,
}

/// Persist a personal fact about the user for future conversations.
///
/// The gateway is instructed (via the system prompt) to call this whenever
/// the user shares something worth remembering.
pub struct SaveMemoryTool {
    memories: Arc<dyn MemoryStore>,
    embedder: Arc<dyn Embedder>,
}

impl SaveMemoryTool {
    #[must_use]
    pub fn new(memories: Arc<dyn MemoryStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { memories, embedder }
    }
}

#[async_trait]
impl Tool for SaveMemoryTool {
    fn name(&self) -> &str {
        "save_memory"
    }

    fn description(&self) -> &str {
        "Save personal information about the user that would be helpful to \
         remember in future conversations: location, preferences, family \
         details, important dates, interests, or any personal facts the user \
         shares."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "memory": {
                    "type": "string",
                    "description": "The personal information to remember about the user. \
                                    Be specific and include context."
                }
            },
            "required": ["memory"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<String> {
        let args: SaveMemoryArgs = serde_json::from_value(args)
            .map_err(|e| anyhow::anyhow!("Invalid save_memory arguments: {e}"))?;

        info!("Saving memory: {}", args.memory);

        let embedding = self.embedder.embed(&args.memory).await?;
        self.memories.insert(&args.memory, &embedding).await?;

        Ok(format!("Successfully saved memory: {}", args.memory))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use ember_core::MemoryFact;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct MemStore {
        facts: Mutex<Vec<MemoryFact>>,
    }

    #[async_trait]
    impl MemoryStore for MemStore {
        async fn insert(&self, memory: &str, embedding: &[f32]) -> anyhow::Result<MemoryFact> {
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
            let facts = self.facts.lock().unwrap();
            Ok(facts.iter().rev().take(limit as usize).cloned().collect())
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.0; 3])
        }
    }

    fn tool() -> (SaveMemoryTool, Arc<MemStore>) {
        let store = Arc::new(MemStore {
            facts: Mutex::new(Vec::new()),
        });
        let tool = SaveMemoryTool::new(store.clone(), Arc::new(FixedEmbedder));
        (tool, store)
    }

    #[tokio::test]
    async fn saves_memory_and_confirms() {
        let (tool, store) = tool();

        let out = tool
            .execute(json!({"memory": "User likes jazz"}))
            .await
            .unwrap();
        assert_eq!(out, "Successfully saved memory: User likes jazz");

        let facts = store.facts.lock().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].memory, "User likes jazz");
        assert_eq!(facts[0].embedding, vec![0.0; 3]);
    }

    #[tokio::test]
    async fn malformed_arguments_are_a_tool_error() {
        let (tool, store) = tool();

        assert!(tool.execute(json!({"note": "wrong field"})).await.is_err());
        assert!(tool.execute(json!("not an object")).await.is_err());
        assert!(store.facts.lock().unwrap().is_empty());
    }

    #[test]
    fn catalog_entry_requires_memory_string() {
        let (tool, _) = tool();
        let params = tool.parameters();
        assert_eq!(params["required"][0], "memory");
        assert_eq!(params["properties"]["memory"]["type"], "string");
    }
}
