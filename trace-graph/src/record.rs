//! Read models returned by graph stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_primitives::Properties;

/// A past decision found by similarity search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Precedent {
    /// Public properties of the decision node.
    pub decision: Properties,
    /// Cosine similarity to the query embedding.
    pub similarity: f32,
}

impl Precedent {
    /// Creates a precedent from decision properties and a similarity score.
    #[must_use]
    pub fn new(decision: Properties, similarity: f32) -> Self {
        Self {
            decision,
            similarity,
        }
    }

    /// Reads a string property of the decision, or `""` when absent.
    #[must_use]
    pub fn text(&self, key: &str) -> &str {
        self.decision.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// Decision properties with the similarity merged in, as shown to API
    /// clients.
    #[must_use]
    pub fn to_detail(&self) -> Properties {
        let mut detail = self.decision.clone();
        detail.insert("similarity".into(), Value::from(f64::from(self.similarity)));
        detail
    }
}

/// A decision together with the nodes that explain it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    /// The decision node itself.
    pub decision: Properties,
    /// Actors that made the decision.
    pub actors: Vec<Properties>,
    /// Evidence the decision is justified by.
    pub evidence: Vec<Properties>,
    /// Policies the decision follows.
    pub policies_followed: Vec<Properties>,
    /// Policies the decision overrides.
    pub policies_overridden: Vec<Properties>,
    /// Human approvals recorded against the decision.
    pub approvals: Vec<Properties>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detail_merges_similarity() {
        let decision = json!({ "id": "dec-1", "prompt": "refund?" })
            .as_object()
            .cloned()
            .unwrap();
        let precedent = Precedent::new(decision, 0.5);

        let detail = precedent.to_detail();
        assert_eq!(detail["id"], "dec-1");
        assert_eq!(detail["similarity"], 0.5);
        assert_eq!(precedent.text("prompt"), "refund?");
        assert_eq!(precedent.text("missing"), "");
    }
}
