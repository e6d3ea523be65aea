//! Error types for the graph subsystem.

use thiserror::Error;

/// Errors emitted by graph stores.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Store configuration was incomplete or invalid.
    #[error("invalid graph configuration: {reason}")]
    InvalidConfig {
        /// Human-readable reason describing the problem.
        reason: String,
    },
    /// Connecting to the database failed.
    #[error("graph connection failed: {reason}")]
    Connection {
        /// Driver message.
        reason: String,
    },
    /// The database rejected or failed a query.
    #[error("graph query failed: {reason}")]
    Backend {
        /// Driver message.
        reason: String,
    },
    /// A stored value could not be decoded.
    #[error("failed to decode graph value: {reason}")]
    Decode {
        /// Human-readable reason describing the failure.
        reason: String,
    },
    /// Record contents failed validation.
    #[error("invalid graph record: {0}")]
    InvalidRecord(&'static str),
    /// Identifier or property validation failed.
    #[error(transparent)]
    Primitive(#[from] trace_primitives::Error),
}

impl GraphError {
    /// Helper to construct backend errors from driver failures.
    #[must_use]
    pub fn backend(reason: impl ToString) -> Self {
        Self::Backend {
            reason: reason.to_string(),
        }
    }

    /// Helper to construct decode errors.
    #[must_use]
    pub fn decode(reason: impl ToString) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;
