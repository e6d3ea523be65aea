//! Graph storage for decision traces.
//!
//! [`GraphStore`] is the seam between the orchestrator and the graph database.
//! [`Neo4jGraphStore`] talks Bolt to a Neo4j instance; [`InMemoryGraphStore`]
//! keeps the same semantics in process for offline runs and tests.

#![warn(missing_docs, clippy::pedantic)]

pub mod embeddings;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod record;
pub mod similarity;
pub mod store;

pub use embeddings::EmbeddingVector;
pub use error::{GraphError, GraphResult};
pub use memory::InMemoryGraphStore;
pub use neo4j::{Neo4jGraphStore, Neo4jSettings};
pub use record::{DecisionTrace, Precedent};
pub use store::{DEFAULT_DATABASE, GraphStore, is_active};
