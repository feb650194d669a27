//! Session resolution: cache, reload, repair, and degradation paths.

#![allow(clippy::unwrap_used)]

mod support;

use ember_conversation::{SessionStore, SessionStoreConfig};
use ember_core::Role;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use support::{MemFacts, MemLog};

fn store_with(log: Arc<MemLog>, facts: Arc<MemFacts>) -> SessionStore {
    SessionStore::new(
        log,
        facts,
        SessionStoreConfig {
            base_prompt: "BASE PROMPT".to_string(),
            memory_limit: 5,
        },
    )
}

#[tokio::test]
async fn first_contact_creates_and_persists_one_system_prompt() {
    let log = Arc::new(MemLog::new());
    let facts = Arc::new(MemFacts::new());
    let store = store_with(log.clone(), facts);

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;

    assert_eq!(session.message_count(), 1);
    assert_eq!(session.messages[0].role, Role::System);
    assert_eq!(session.messages[0].content, "BASE PROMPT");

    let rows = log.rows_for("abc123");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, Role::System);
}

#[tokio::test]
async fn resolving_twice_returns_the_same_cached_instance() {
    let log = Arc::new(MemLog::new());
    let store = store_with(log.clone(), Arc::new(MemFacts::new()));

    let first = store.resolve("abc123").await;
    let second = store.resolve("abc123").await;

    assert!(Arc::ptr_eq(&first, &second));
    // No duplicate system prompt was persisted by the second resolve.
    assert_eq!(log.rows_for("abc123").len(), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn concurrent_first_contact_persists_one_system_prompt() {
    let log = Arc::new(MemLog::new());
    let store = Arc::new(store_with(log.clone(), Arc::new(MemFacts::new())));

    // Many simultaneous first contacts for one id must agree on a single
    // session and synthesize its system prompt exactly once.
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.resolve("abc123").await })
        })
        .collect();

    let mut handles = Vec::with_capacity(tasks.len());
    for task in tasks {
        handles.push(task.await.unwrap());
    }

    for handle in &handles[1..] {
        assert!(Arc::ptr_eq(&handles[0], handle));
    }

    let rows = log.rows_for("abc123");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, Role::System);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn reload_reconstructs_persisted_history_in_order() {
    let log = Arc::new(MemLog::new());
    log.seed("abc123", Role::System, "old prompt");
    log.seed("abc123", Role::User, "What's 15% of 250?");
    log.seed("abc123", Role::Assistant, "37.50");
    let store = store_with(log.clone(), Arc::new(MemFacts::new()));

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;

    let got: Vec<(Role, &str)> = session
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![
            (Role::System, "old prompt"),
            (Role::User, "What's 15% of 250?"),
            (Role::Assistant, "37.50"),
        ]
    );
}

#[tokio::test]
async fn reload_without_system_row_synthesizes_one_in_memory_only() {
    let log = Arc::new(MemLog::new());
    log.seed("abc123", Role::User, "hello");
    log.seed("abc123", Role::Assistant, "hi");
    let facts = Arc::new(MemFacts::with_facts(&["User likes jazz"]));
    let store = store_with(log.clone(), facts);

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;

    assert_eq!(session.message_count(), 3);
    assert_eq!(session.messages[0].role, Role::System);
    assert!(session.messages[0].content.contains("User likes jazz"));
    assert_eq!(session.messages[1].content, "hello");

    // The log itself was not rewritten.
    assert_eq!(log.rows_for("abc123").len(), 2);
}

#[tokio::test]
async fn reload_tolerates_a_dangling_trailing_user_row() {
    let log = Arc::new(MemLog::new());
    log.seed("abc123", Role::System, "prompt");
    log.seed("abc123", Role::User, "unanswered");
    let store = store_with(log, Arc::new(MemFacts::new()));

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;

    assert_eq!(session.message_count(), 2);
    assert_eq!(session.messages[1].role, Role::User);
}

#[tokio::test]
async fn load_failure_degrades_to_a_fresh_session() {
    let log = Arc::new(MemLog::new());
    log.fail_reads.store(true, Ordering::SeqCst);
    let store = store_with(log, Arc::new(MemFacts::new()));

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;

    assert_eq!(session.message_count(), 1);
    assert_eq!(session.messages[0].role, Role::System);
}

#[tokio::test]
async fn memory_fetch_failure_falls_back_to_base_prompt() {
    let facts = Arc::new(MemFacts::new());
    facts.fail.store(true, Ordering::SeqCst);
    let store = store_with(Arc::new(MemLog::new()), facts);

    let handle = store.resolve("abc123").await;
    let session = handle.lock().await;
    assert_eq!(session.messages[0].content, "BASE PROMPT");
}

#[tokio::test]
async fn new_session_prompt_includes_recent_memories() {
    let facts = Arc::new(MemFacts::with_facts(&[
        "User likes jazz",
        "User lives in Portland",
    ]));
    let store = store_with(Arc::new(MemLog::new()), facts);

    let handle = store.resolve("fresh").await;
    let session = handle.lock().await;

    let prompt = &session.messages[0].content;
    assert!(prompt.starts_with("BASE PROMPT"));
    assert!(prompt.contains("- User likes jazz"));
    assert!(prompt.contains("- User lives in Portland"));
}
