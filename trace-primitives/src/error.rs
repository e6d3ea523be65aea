//! Shared error definitions for trace primitives.

use thiserror::Error;

/// Result alias used by primitive constructors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// Node identifier failed validation.
    #[error("invalid node id `{id}`: {reason}")]
    InvalidNodeId {
        /// The offending identifier string.
        id: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Property payload was not a flat JSON object.
    #[error("invalid properties: {reason}")]
    InvalidProperties {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Label or relationship name is not part of the schema.
    #[error("unknown schema element `{0}`")]
    UnknownSchema(String),
}
