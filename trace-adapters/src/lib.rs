//! Model and embedding adapters used by the decision orchestrator.
//!
//! Each module exposes implementations for a specific provider endpoint while
//! sharing the trait-based interfaces defined in [`traits`] and
//! [`embeddings`].

#![warn(missing_docs, clippy::pedantic)]

pub mod embeddings;
pub mod openai;
pub mod traits;

mod http_client;
