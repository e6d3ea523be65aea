//! Error types for the decision pipeline.

use thiserror::Error;
use trace_adapters::traits::AdapterError;
use trace_graph::GraphError;

/// Errors produced while deciding or recording decisions.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The caller supplied an unusable request.
    #[error("invalid decision request: {reason}")]
    InvalidRequest {
        /// Human-readable reason describing the problem.
        reason: String,
    },
    /// A referenced node does not exist.
    #[error("{what} `{id}` not found")]
    NotFound {
        /// Kind of node that was looked up.
        what: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
    /// The model or embedding provider failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The graph store failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Identifier or property validation failed.
    #[error(transparent)]
    Primitive(#[from] trace_primitives::Error),
}

impl OrchestratorError {
    /// Helper to construct invalid-request errors.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
