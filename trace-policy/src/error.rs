//! Error types for policy and knowledge-base handling.

use thiserror::Error;

/// Errors emitted by the policy crate.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Knowledge-base document failed to parse.
    #[error("invalid knowledge base: {reason}")]
    InvalidKnowledgeBase {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// Writing to the graph failed.
    #[error(transparent)]
    Graph(#[from] trace_graph::GraphError),
    /// Identifier or property validation failed.
    #[error(transparent)]
    Primitive(#[from] trace_primitives::Error),
}

impl PolicyError {
    /// Helper to construct knowledge-base errors.
    #[must_use]
    pub fn invalid(reason: impl ToString) -> Self {
        Self::InvalidKnowledgeBase {
            reason: reason.to_string(),
        }
    }
}

/// Result alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
