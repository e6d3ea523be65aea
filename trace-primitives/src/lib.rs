//! Core shared types for context graph decision traces.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod properties;
mod schema;
mod severity;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for graph nodes and generated decisions.
pub use ids::{DecisionId, NodeId};
/// Flat property maps stored on graph nodes.
pub use properties::{EMBEDDING_KEY, Properties, normalize_properties, public_properties};
/// Node labels and relationship types of the decision-trace graph.
pub use schema::{NodeLabel, Relation};
/// Policy severity levels and their ordering.
pub use severity::Severity;
