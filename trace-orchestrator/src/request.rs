//! Inputs to the decision pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_primitives::{NodeId, Properties};

/// One piece of customer context supplied with a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceItem {
    /// Free-text note, e.g. `"Customer has 3 support tickets this month"`.
    Text(String),
    /// Structured record such as a support ticket; an `id` links an existing
    /// or new evidence node.
    Record(Properties),
}

impl EvidenceItem {
    /// Single-line description shown to the model.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Record(record) => {
                let kind = record_text(record, "type").unwrap_or("Unknown");
                let detail = record_text(record, "description")
                    .or_else(|| record_text(record, "issue"))
                    .unwrap_or("N/A");
                format!("{kind}: {detail}")
            }
        }
    }

    /// Identifier of a structured record, when it names one.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Record(record) => record_text(record, "id").filter(|id| !id.trim().is_empty()),
        }
    }

    /// Properties stored on the evidence node.
    #[must_use]
    pub fn to_properties(&self) -> Properties {
        match self {
            Self::Text(text) => {
                let mut props = Properties::new();
                props.insert("type".into(), Value::from("text"));
                props.insert("description".into(), Value::from(text.as_str()));
                props
            }
            Self::Record(record) => record.clone(),
        }
    }
}

fn record_text<'a>(record: &'a Properties, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

/// A request for a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    /// The customer request in natural language.
    pub request: String,
    /// Supporting customer context.
    #[serde(default)]
    pub evidence: Vec<EvidenceItem>,
    /// Actor recorded as making the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<NodeId>,
    /// Database to read from and write to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl DecisionRequest {
    /// Creates a request with no evidence.
    #[must_use]
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            evidence: Vec::new(),
            actor: None,
            database: None,
        }
    }

    /// Adds an evidence item.
    #[must_use]
    pub fn with_evidence(mut self, item: EvidenceItem) -> Self {
        self.evidence.push(item);
        self
    }

    /// Records the decision against `actor`.
    #[must_use]
    pub fn with_actor(mut self, actor: NodeId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Targets a named database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}
