//! Policies, verdicts and the knowledge base consulted before every decision.

#![warn(missing_docs, clippy::pedantic)]

pub mod error;
pub mod knowledge_base;
pub mod policy;
pub mod tags;
pub mod verdict;

pub use error::{PolicyError, PolicyResult};
pub use knowledge_base::{KnowledgeBase, LoadSummary};
pub use policy::PolicySummary;
pub use tags::extract_tags;
pub use verdict::Verdict;
