use async_trait::async_trait;
use chrono::Utc;
use ember_core::{MemoryFact, MemoryStore, MessageStore, Role, StoredTurn};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::{conversations, memories};

fn is_table_already_exists_error(err: &DbErr) -> bool {
    let text = err.to_string();
    text.contains("table") && text.contains("already exists")
}

/// Pooled connection to the durable store, shared across all sessions.
pub struct Storage {
    db: DatabaseConnection,
}

impl Storage {
    /// Connect and make sure the schema exists.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        info!("Connecting to database");
        let db = Database::connect(url).await?;

        let schema = Schema::new(db.get_database_backend());
        let builder = db.get_database_backend();
        for stmt in [
            schema.create_table_from_entity(conversations::Entity),
            schema.create_table_from_entity(memories::Entity),
        ] {
            match db.execute_unprepared(&builder.build(&stmt).to_string()).await {
                Ok(_) => {}
                Err(e) if is_table_already_exists_error(&e) => {
                    info!("Table already exists, skipping creation");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Storage initialized");
        Ok(Self { db })
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for Storage {
    async fn append(&self, session_id: &str, role: Role, content: &str) -> anyhow::Result<()> {
        conversations::ActiveModel {
            id: ActiveValue::NotSet,
            session_id: ActiveValue::Set(session_id.to_string()),
            role: ActiveValue::Set(role.as_str().to_string()),
            content: ActiveValue::Set(content.to_string()),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        Ok(())
    }

    async fn history(&self, session_id: &str) -> anyhow::Result<Vec<StoredTurn>> {
        let rows = conversations::Entity::find()
            .filter(conversations::Column::SessionId.eq(session_id))
            .order_by_asc(conversations::Column::CreatedAt)
            .order_by_asc(conversations::Column::Id)
            .all(&self.db)
            .await?;

        // Rows with a role this build does not know are skipped, not fatal.
        Ok(rows
            .into_iter()
            .filter_map(|row| match Role::parse(&row.role) {
                Some(role) => Some(StoredTurn {
                    role,
                    content: row.content,
                    created_at: row.created_at,
                }),
                None => {
                    warn!("Skipping row with unknown role: {}", row.role);
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl MemoryStore for Storage {
    async fn insert(&self, memory: &str, embedding: &[f32]) -> anyhow::Result<MemoryFact> {
        let fact = MemoryFact {
            id: Uuid::now_v7(),
            memory: memory.to_string(),
            embedding: embedding.to_vec(),
            created_at: Utc::now(),
        };

        memories::ActiveModel {
            id: ActiveValue::Set(fact.id),
            memory: ActiveValue::Set(fact.memory.clone()),
            embedding: ActiveValue::Set(serde_json::to_value(&fact.embedding)?),
            created_at: ActiveValue::Set(fact.created_at),
        }
        .insert(&self.db)
        .await?;

        info!("Saved memory: {}", fact.memory);
        Ok(fact)
    }

    async fn recent(&self, limit: u64) -> anyhow::Result<Vec<MemoryFact>> {
        let rows = memories::Entity::find()
            .order_by_desc(memories::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| MemoryFact {
                id: row.id,
                memory: row.memory,
                embedding: serde_json::from_value(row.embedding).unwrap_or_default(),
                created_at: row.created_at,
            })
            .collect())
    }
}
