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

//! Per-session conversation state and the turn protocol.
//!
//! This is the stateful heart of the gateway: a cache of live sessions
//! reconciled with the durable message log, an orchestrator that drives one
//! request/response cycle (including the tool-invocation round trip), and a
//! background reaper that evicts idle sessions.
//!
//! # Key properties
//! - A session always starts with exactly one system message
//! - Get-or-create for one session id is serialized; no duplicate prompts
//! - Persistence is best effort; in-memory state is authoritative
//! - Eviction only drops the cache entry, never persisted history

mod orchestrator;
mod prompt;
mod reaper;
mod session;
mod store;

pub use orchestrator::{OrchestratorConfig, TurnError, TurnOrchestrator};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, compose_system_prompt};
pub use reaper::{ReaperConfig, ReaperHandle, SessionReaper};
pub use session::Session;
pub use store::{SessionStore, SessionStoreConfig};
