//! Typed view over policy nodes.

use serde_json::Value;
use trace_primitives::{Properties, Severity};

/// A policy as read from the graph.
///
/// Keeps the raw properties so API responses show everything stored on the
/// node, including fields this view does not model.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySummary {
    props: Properties,
}

impl PolicySummary {
    /// Wraps raw policy properties.
    #[must_use]
    pub fn new(props: Properties) -> Self {
        Self { props }
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Policy identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.text("id").unwrap_or_default()
    }

    /// Display name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    /// Description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    /// Severity level.
    #[must_use]
    pub fn severity(&self) -> Severity {
        Severity::from_property(self.props.get("severity"))
    }

    /// Raw severity label, if set.
    #[must_use]
    pub fn severity_label(&self) -> Option<&str> {
        self.text("severity")
    }

    /// Whether applying the policy requires sign-off.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.props
            .get("requires_approval")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Who must approve, if named.
    #[must_use]
    pub fn approval_level(&self) -> Option<&str> {
        self.text("approval_level")
    }

    /// Circumstances under which the policy may be set aside.
    #[must_use]
    pub fn exception_conditions(&self) -> Option<&str> {
        self.text("exception_conditions").filter(|text| !text.is_empty())
    }

    /// Whether `text` names this policy (case-insensitive).
    #[must_use]
    pub fn is_mentioned_in(&self, text: &str) -> bool {
        self.name()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .is_some_and(|name| text.to_lowercase().contains(&name.to_lowercase()))
    }

    /// Consumes the view, returning the raw properties.
    #[must_use]
    pub fn into_properties(self) -> Properties {
        self.props
    }
}

impl From<Properties> for PolicySummary {
    fn from(props: Properties) -> Self {
        Self::new(props)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn policy() -> PolicySummary {
        PolicySummary::new(
            json!({
                "id": "policy-refund-nonrefundable",
                "name": "Non-Refundable Ticket Policy",
                "severity": "strict",
                "requires_approval": true,
                "approval_level": "manager",
                "exception_conditions": "Service failures",
                "tags": ["refund", "non_refundable"]
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
    }

    #[test]
    fn reads_typed_fields() {
        let policy = policy();
        assert_eq!(policy.id(), "policy-refund-nonrefundable");
        assert_eq!(policy.severity(), Severity::Strict);
        assert!(policy.requires_approval());
        assert_eq!(policy.approval_level(), Some("manager"));
        assert_eq!(policy.exception_conditions(), Some("Service failures"));
        assert!(PolicySummary::new(Properties::new()).description().is_none());
    }

    #[test]
    fn detects_mentions_by_name() {
        let policy = policy();
        assert!(policy.is_mentioned_in("Followed non-refundable ticket policy, VIP"));
        assert!(!policy.is_mentioned_in("Standard Refund Policy"));
    }
}
