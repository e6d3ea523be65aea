//! Organisational knowledge the decision agent consults: policy categories,
//! policies, product tiers and approval workflows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use trace_graph::GraphStore;
use trace_primitives::{NodeId, NodeLabel, Properties, Relation, normalize_properties};

use crate::{PolicyError, PolicyResult};

const BUILTIN: &str = include_str!("../data/knowledge_base.json");

/// A node in the knowledge-base document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Node identifier.
    pub id: NodeId,
    /// Remaining properties stored on the node.
    #[serde(flatten)]
    pub properties: Properties,
}

/// A policy in the knowledge-base document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Policy identifier.
    pub id: NodeId,
    /// Category the policy is `PART_OF`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<NodeId>,
    /// Policies this one replaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supersedes: Vec<NodeId>,
    /// Remaining properties stored on the node.
    #[serde(flatten)]
    pub properties: Properties,
}

/// Serializable knowledge-base document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Policy categories.
    #[serde(default)]
    pub categories: Vec<KnowledgeEntry>,
    /// Policies.
    #[serde(default)]
    pub policies: Vec<PolicyEntry>,
    /// Product tiers.
    #[serde(default)]
    pub product_tiers: Vec<KnowledgeEntry>,
    /// Approval workflows.
    #[serde(default)]
    pub workflows: Vec<KnowledgeEntry>,
}

/// Counts reported after loading a knowledge base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Policy categories written.
    pub categories: usize,
    /// Policies written.
    pub policies: usize,
    /// Product tiers written.
    pub product_tiers: usize,
    /// Approval workflows written.
    pub workflows: usize,
    /// Relationships created.
    pub links: usize,
}

impl KnowledgeBase {
    /// The sample organisation shipped with the service.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidKnowledgeBase`] if the bundled document
    /// fails to parse.
    pub fn builtin() -> PolicyResult<Self> {
        Self::from_json(BUILTIN)
    }

    /// Parses a knowledge-base document.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidKnowledgeBase`] on malformed JSON.
    pub fn from_json(text: &str) -> PolicyResult<Self> {
        serde_json::from_str(text).map_err(PolicyError::invalid)
    }

    /// Writes every node and relationship into `store`.
    ///
    /// Loading is idempotent: nodes are merged by id and relationships are
    /// only created once.
    ///
    /// # Errors
    ///
    /// Returns an error if a property payload is invalid or the store fails.
    pub async fn load_into(&self, store: &dyn GraphStore) -> PolicyResult<LoadSummary> {
        let mut summary = LoadSummary::default();

        for entry in &self.categories {
            upsert(store, NodeLabel::PolicyCategory, &entry.id, &entry.properties).await?;
            summary.categories += 1;
        }
        for entry in &self.product_tiers {
            upsert(store, NodeLabel::ProductTier, &entry.id, &entry.properties).await?;
            summary.product_tiers += 1;
        }
        for entry in &self.workflows {
            upsert(store, NodeLabel::ApprovalWorkflow, &entry.id, &entry.properties).await?;
            summary.workflows += 1;
        }
        for policy in &self.policies {
            upsert(store, NodeLabel::Policy, &policy.id, &policy.properties).await?;
            summary.policies += 1;
        }

        for policy in &self.policies {
            if let Some(category) = &policy.category {
                summary.links += link(store, Relation::PartOf, &policy.id, category).await?;
            }
            for replaced in &policy.supersedes {
                summary.links += link(store, Relation::Supersedes, &policy.id, replaced).await?;
            }
        }

        info!(
            database = store.database(),
            categories = summary.categories,
            policies = summary.policies,
            product_tiers = summary.product_tiers,
            workflows = summary.workflows,
            links = summary.links,
            "knowledge base loaded"
        );
        Ok(summary)
    }
}

async fn upsert(
    store: &dyn GraphStore,
    label: NodeLabel,
    id: &NodeId,
    props: &Properties,
) -> PolicyResult<()> {
    let props = normalize_properties(Value::Object(props.clone()))?;
    store.upsert_node(label, id, props).await?;
    Ok(())
}

async fn link(
    store: &dyn GraphStore,
    relation: Relation,
    from: &NodeId,
    to: &NodeId,
) -> PolicyResult<usize> {
    if store.link(relation, from, to).await? {
        Ok(1)
    } else {
        warn!(%relation, %from, %to, "knowledge base link skipped: endpoint missing");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use trace_graph::InMemoryGraphStore;

    use super::*;

    #[test]
    fn builtin_document_has_sample_organisation() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert_eq!(kb.categories.len(), 7);
        assert_eq!(kb.policies.len(), 16);
        assert_eq!(kb.product_tiers.len(), 4);
        assert_eq!(kb.workflows.len(), 4);
        assert!(kb.policies.iter().all(|policy| policy.category.is_some()));
    }

    #[test]
    fn rejects_malformed_documents() {
        let err = KnowledgeBase::from_json("{\"policies\": [{\"name\": \"no id\"}]}").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidKnowledgeBase { .. }));
    }

    #[tokio::test]
    async fn loads_nodes_and_links() {
        let store = InMemoryGraphStore::new();
        let kb = KnowledgeBase::builtin().unwrap();

        let summary = kb.load_into(&store).await.unwrap();
        assert_eq!(summary.policies, 16);
        assert_eq!(summary.links, 16);
        assert_eq!(store.node_count().await, 7 + 16 + 4 + 4);

        let refunds = store.policies_by_category("Refunds").await.unwrap();
        assert_eq!(refunds.len(), 3);
        assert_eq!(refunds[0]["id"], "policy-refund-nonrefundable");

        let escalation = store
            .get_node(NodeLabel::Policy, &NodeId::new("policy-high-value-escalation").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(escalation["thresholds"].is_string());

        let executive = store
            .get_node(NodeLabel::ApprovalWorkflow, &NodeId::new("workflow-executive").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(!executive.contains_key("max_amount"));

        let again = kb.load_into(&store).await.unwrap();
        assert_eq!(again, summary);
        assert_eq!(store.edge_count().await, 16);
    }

    #[tokio::test]
    async fn links_superseded_policies() {
        let kb = KnowledgeBase::from_json(
            r#"{
                "policies": [
                    { "id": "policy-old", "name": "Old" },
                    { "id": "policy-new", "name": "New", "supersedes": ["policy-old", "policy-gone"] }
                ]
            }"#,
        )
        .unwrap();
        let store = InMemoryGraphStore::new();

        let summary = kb.load_into(&store).await.unwrap();
        assert_eq!(summary.links, 1);
    }
}
