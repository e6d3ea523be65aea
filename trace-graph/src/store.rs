//! Storage abstraction for the decision-trace graph.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use trace_primitives::{EMBEDDING_KEY, NodeId, NodeLabel, Properties, Relation, Severity};

use crate::similarity::rank_precedents;
use crate::{DecisionTrace, EmbeddingVector, GraphResult, Precedent};

/// Database used when none is named.
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Trait implemented by decision-trace graph backends.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Name of the database this handle reads and writes.
    fn database(&self) -> &str;

    /// Returns a handle to the same backend bound to `database`.
    async fn scoped(&self, database: &str) -> GraphResult<Arc<dyn GraphStore>>;

    /// Creates the node if missing, then merges `props` into it.
    ///
    /// `id` and `embedding` keys in `props` are ignored; `null` values remove
    /// the property.
    async fn upsert_node(&self, label: NodeLabel, id: &NodeId, props: Properties)
    -> GraphResult<()>;

    /// Creates `relation` between two existing nodes.
    ///
    /// Returns `false` when either endpoint is missing.
    async fn link(&self, relation: Relation, from: &NodeId, to: &NodeId) -> GraphResult<bool>;

    /// Fetches a node's public properties.
    async fn get_node(&self, label: NodeLabel, id: &NodeId) -> GraphResult<Option<Properties>>;

    /// Fetches a decision together with its actors, evidence, policies and
    /// approvals.
    async fn decision_trace(&self, id: &NodeId) -> GraphResult<Option<DecisionTrace>>;

    /// Active policies carrying any of `tags`, strictest first.
    async fn policies_by_tags(&self, tags: &[String]) -> GraphResult<Vec<Properties>>;

    /// Active policies in the category matched by id or name, strictest first.
    async fn policies_by_category(&self, category: &str) -> GraphResult<Vec<Properties>>;

    /// Stores an embedding on a decision node.
    ///
    /// Returns `false` when the decision does not exist.
    async fn set_embedding(&self, id: &NodeId, embedding: &EmbeddingVector) -> GraphResult<bool>;

    /// Every decision that carries an embedding.
    async fn embedded_decisions(&self) -> GraphResult<Vec<(Properties, EmbeddingVector)>>;

    /// The `top_k` decisions most similar to `query`.
    async fn similar_decisions(
        &self,
        query: &EmbeddingVector,
        top_k: usize,
    ) -> GraphResult<Vec<Precedent>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.embedded_decisions().await?;
        Ok(rank_precedents(query, candidates, top_k))
    }
}

/// Whether a policy counts as active: `active` missing, null or `true`.
#[must_use]
pub fn is_active(props: &Properties) -> bool {
    match props.get("active") {
        None | Some(Value::Null) => true,
        Some(value) => value.as_bool().unwrap_or(false),
    }
}

/// Orders policies strict → moderate → flexible → other, then by id.
pub(crate) fn sort_policies(policies: &mut [Properties]) {
    policies.sort_by(|a, b| {
        let rank_a = Severity::from_property(a.get("severity")).rank();
        let rank_b = Severity::from_property(b.get("severity")).rank();
        rank_b.cmp(&rank_a).then_with(|| text(a, "id").cmp(text(b, "id")))
    });
}

/// Drops the keys callers may not write through [`GraphStore::upsert_node`].
pub(crate) fn writable_properties(mut props: Properties) -> Properties {
    props.remove("id");
    props.remove(EMBEDDING_KEY);
    props
}

pub(crate) fn text<'a>(props: &'a Properties, key: &str) -> &'a str {
    props.get(key).and_then(Value::as_str).unwrap_or_default()
}
