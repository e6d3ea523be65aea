//! Node identifier types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_ID_LEN: usize = 128;
const DECISION_PREFIX: &str = "dec-";
const DECISION_SUFFIX_LEN: usize = 12;

/// Identifier of any node in the decision-trace graph.
///
/// Ids are caller supplied (`policy-refund-standard`, `agent-ai-001`, ...), so
/// validation only rejects values that could not round-trip through the graph
/// driver or the URL path.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNodeId`] if the identifier is empty, too long,
    /// padded with whitespace, or contains control characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_identifier(&id)?;
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidNodeId {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_ID_LEN {
        return Err(Error::InvalidNodeId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_ID_LEN}"),
        });
    }

    if id.trim() != id {
        return Err(Error::InvalidNodeId {
            id: id.into(),
            reason: "identifier cannot start or end with whitespace".into(),
        });
    }

    if id.chars().any(char::is_control) {
        return Err(Error::InvalidNodeId {
            id: id.into(),
            reason: "identifier cannot contain control characters".into(),
        });
    }

    Ok(())
}

/// Identifier minted for decisions produced by the orchestrator.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecisionId(NodeId);

impl DecisionId {
    /// Generates a fresh `dec-xxxxxxxxxxxx` identifier from a random UUID.
    #[must_use]
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(NodeId(format!(
            "{DECISION_PREFIX}{}",
            &hex[..DECISION_SUFFIX_LEN]
        )))
    }

    /// Returns the underlying node identifier.
    #[must_use]
    pub fn as_node_id(&self) -> &NodeId {
        &self.0
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for DecisionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<DecisionId> for NodeId {
    fn from(value: DecisionId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_decision_ids_have_prefix_and_hex_suffix() {
        let id = DecisionId::generate();
        let suffix = id.as_str().strip_prefix("dec-").expect("prefix");
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, DecisionId::generate());
    }

    #[test]
    fn rejects_blank_and_padded_ids() {
        assert!(matches!(NodeId::new(""), Err(Error::InvalidNodeId { .. })));
        assert!(matches!(NodeId::new(" dec-1"), Err(Error::InvalidNodeId { .. })));
        assert!(matches!(NodeId::new("dec\n1"), Err(Error::InvalidNodeId { .. })));
        assert!(NodeId::new("policy-refund-standard").is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let err = serde_json::from_str::<NodeId>("\"\"");
        assert!(err.is_err());
        let id: NodeId = serde_json::from_str("\"agent-ai-001\"").unwrap();
        assert_eq!(id.as_str(), "agent-ai-001");
    }
}
