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

//! Durable persistence for conversation turns and memory facts.
//!
//! One [`Storage`] value wraps a pooled database connection and implements
//! both store traits from `ember_core`. Every insert is its own unit of
//! work; no transaction spans more than one write.

pub mod entity;
mod store;

pub use store::Storage;
