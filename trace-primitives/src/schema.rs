//! Node labels and relationship types of the decision-trace graph.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Labels attached to nodes in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    /// A decision produced by an agent or recorded by a caller.
    Decision,
    /// A human or AI agent that makes or approves decisions.
    Actor,
    /// Supporting material such as tickets or outage records.
    Evidence,
    /// An organizational rule consulted during decision-making.
    Policy,
    /// A manager override or exception grant.
    Approval,
    /// Grouping of related policies.
    PolicyCategory,
    /// A product plan with its refund and support terms.
    ProductTier,
    /// A chain of approval steps.
    ApprovalWorkflow,
}

impl NodeLabel {
    /// All labels known to the schema.
    pub const ALL: [Self; 8] = [
        Self::Decision,
        Self::Actor,
        Self::Evidence,
        Self::Policy,
        Self::Approval,
        Self::PolicyCategory,
        Self::ProductTier,
        Self::ApprovalWorkflow,
    ];

    /// Returns the label exactly as stored in the graph.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decision => "Decision",
            Self::Actor => "Actor",
            Self::Evidence => "Evidence",
            Self::Policy => "Policy",
            Self::Approval => "Approval",
            Self::PolicyCategory => "PolicyCategory",
            Self::ProductTier => "ProductTier",
            Self::ApprovalWorkflow => "ApprovalWorkflow",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| Error::UnknownSchema(s.to_owned()))
    }
}

/// Relationship types with fixed endpoint labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// `(Actor)-[:MADE]->(Decision)`
    Made,
    /// `(Decision)-[:JUSTIFIED_BY]->(Evidence)`
    JustifiedBy,
    /// `(Decision)-[:OVERRIDES]->(Policy)`
    Overrides,
    /// `(Decision)-[:FOLLOWS]->(Policy)`
    Follows,
    /// `(Approval)-[:APPROVED]->(Decision)`
    Approved,
    /// `(Policy)-[:PART_OF]->(PolicyCategory)`
    PartOf,
    /// `(Policy)-[:SUPERSEDES]->(Policy)`
    Supersedes,
}

impl Relation {
    /// All relationship types known to the schema.
    pub const ALL: [Self; 7] = [
        Self::Made,
        Self::JustifiedBy,
        Self::Overrides,
        Self::Follows,
        Self::Approved,
        Self::PartOf,
        Self::Supersedes,
    ];

    /// Returns the relationship type exactly as stored in the graph.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Made => "MADE",
            Self::JustifiedBy => "JUSTIFIED_BY",
            Self::Overrides => "OVERRIDES",
            Self::Follows => "FOLLOWS",
            Self::Approved => "APPROVED",
            Self::PartOf => "PART_OF",
            Self::Supersedes => "SUPERSEDES",
        }
    }

    /// Label of the node the relationship starts from.
    #[must_use]
    pub const fn source(self) -> NodeLabel {
        match self {
            Self::Made => NodeLabel::Actor,
            Self::JustifiedBy | Self::Overrides | Self::Follows => NodeLabel::Decision,
            Self::Approved => NodeLabel::Approval,
            Self::PartOf | Self::Supersedes => NodeLabel::Policy,
        }
    }

    /// Label of the node the relationship points to.
    #[must_use]
    pub const fn target(self) -> NodeLabel {
        match self {
            Self::Made | Self::Approved => NodeLabel::Decision,
            Self::JustifiedBy => NodeLabel::Evidence,
            Self::Overrides | Self::Follows | Self::Supersedes => NodeLabel::Policy,
            Self::PartOf => NodeLabel::PolicyCategory,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_from_graph_names() {
        for label in NodeLabel::ALL {
            assert_eq!(label.as_str().parse::<NodeLabel>().unwrap(), label);
        }
        assert!("Customer".parse::<NodeLabel>().is_err());
    }

    #[test]
    fn relation_endpoints_match_schema() {
        assert_eq!(Relation::Made.source(), NodeLabel::Actor);
        assert_eq!(Relation::Made.target(), NodeLabel::Decision);
        assert_eq!(Relation::Approved.source(), NodeLabel::Approval);
        assert_eq!(Relation::PartOf.target(), NodeLabel::PolicyCategory);
        assert_eq!(Relation::Supersedes.source(), Relation::Supersedes.target());
    }

    #[test]
    fn relation_serializes_as_graph_type() {
        let json = serde_json::to_string(&Relation::JustifiedBy).unwrap();
        assert_eq!(json, "\"JUSTIFIED_BY\"");
    }
}
