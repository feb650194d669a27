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

pub mod proto;
pub mod service;

pub use proto::v1::assistant_service_server::{AssistantService, AssistantServiceServer};
pub use proto::v1::{ChatRequest, ChatResponse};
pub use service::ChatService;
