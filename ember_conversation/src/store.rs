//! In-memory cache of active sessions, backed by the durable message log.

use chrono::Utc;
use ember_core::{ChatMessage, MemoryStore, MessageStore, Role, StoredTurn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::prompt::{DEFAULT_SYSTEM_PROMPT, compose_system_prompt};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Base system prompt, before memory injection.
    pub base_prompt: String,
    /// How many recent memory facts to inject into the system prompt.
    pub memory_limit: u64,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            base_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            memory_limit: 5,
        }
    }
}

/// Owns the session cache and the get-or-create protocol.
///
/// Resolution never fails from the caller's point of view: any persistence
/// problem degrades to a fresh session so the turn can proceed. The whole
/// check-then-act sequence runs under one cache-wide lock, so two
/// concurrent first contacts for the same id cannot synthesize two system
/// prompts. Each cached session carries its own mutex; a turn holds the
/// session lock, not the cache lock.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    messages: Arc<dyn MessageStore>,
    memories: Arc<dyn MemoryStore>,
    config: SessionStoreConfig,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        messages: Arc<dyn MessageStore>,
        memories: Arc<dyn MemoryStore>,
        config: SessionStoreConfig,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            messages,
            memories,
            config,
        }
    }

    /// Get the cached session for `session_id`, reloading or creating it on
    /// a miss. A cache hit does not count as activity.
    pub async fn resolve(&self, session_id: &str) -> Arc<Mutex<Session>> {
        let mut cache = self.sessions.lock().await;

        if let Some(handle) = cache.get(session_id) {
            debug!("Session cache hit: {session_id}");
            return Arc::clone(handle);
        }

        let session = self.load_or_create(session_id).await;
        let handle = Arc::new(Mutex::new(session));
        cache.insert(session_id.to_string(), Arc::clone(&handle));
        handle
    }

    /// Drop cached sessions idle for longer than `threshold`. Persisted
    /// history is untouched; a later resolve reloads it.
    pub async fn evict_idle(&self, threshold: Duration) -> usize {
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::Duration::MAX);
        let now = Utc::now();

        let mut cache = self.sessions.lock().await;
        let before = cache.len();
        cache.retain(|id, handle| match handle.try_lock() {
            Ok(session) => {
                let keep = now.signed_duration_since(session.last_activity) <= threshold;
                if !keep {
                    info!("Evicting idle session: {id}");
                }
                keep
            }
            // Locked means a turn is in flight right now; not idle.
            Err(_) => true,
        });
        before - cache.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    async fn load_or_create(&self, session_id: &str) -> Session {
        match self.messages.history(session_id).await {
            Ok(rows) if !rows.is_empty() => self.rebuild(session_id, rows).await,
            Ok(_) => self.create(session_id).await,
            Err(e) => {
                warn!("Failed to load history for {session_id}: {e}; starting fresh");
                self.create(session_id).await
            }
        }
    }

    /// Reconstruct a session from its persisted rows, repairing a missing
    /// system prompt in memory only (the log is never rewritten).
    async fn rebuild(&self, session_id: &str, rows: Vec<StoredTurn>) -> Session {
        let created_at = rows.first().map_or_else(Utc::now, |row| row.created_at);
        let mut session = Session {
            id: session_id.to_string(),
            messages: rows
                .into_iter()
                .map(|row| ChatMessage::new(row.role, row.content))
                .collect(),
            created_at,
            last_activity: Utc::now(),
        };

        if !session.has_system() {
            let prompt = self.system_prompt().await;
            session
                .messages
                .insert(0, ChatMessage::new(Role::System, prompt));
        }

        info!(
            "Restored session {session_id} with {} messages",
            session.message_count()
        );
        session
    }

    async fn create(&self, session_id: &str) -> Session {
        let prompt = self.system_prompt().await;

        let mut session = Session::new(session_id);
        session.push(ChatMessage::new(Role::System, prompt.clone()));

        // Best effort; the in-memory session is authoritative either way.
        if let Err(e) = self.messages.append(session_id, Role::System, &prompt).await {
            warn!("Failed to persist system prompt for {session_id}: {e}");
        }

        info!("Created new session: {session_id}");
        session
    }

    async fn system_prompt(&self) -> String {
        match self.memories.recent(self.config.memory_limit).await {
            Ok(facts) => compose_system_prompt(&self.config.base_prompt, &facts),
            Err(e) => {
                warn!("Failed to fetch memories: {e}; using base prompt");
                self.config.base_prompt.clone()
            }
        }
    }
}
