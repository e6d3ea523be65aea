//! In-process graph store used for offline runs and tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use trace_primitives::{NodeId, NodeLabel, Properties, Relation, public_properties};

use crate::store::{DEFAULT_DATABASE, GraphStore, is_active, sort_policies, text, writable_properties};
use crate::{DecisionTrace, EmbeddingVector, GraphResult};

#[derive(Debug, Default)]
struct Partition {
    nodes: HashMap<(NodeLabel, NodeId), Properties>,
    edges: BTreeSet<(Relation, NodeId, NodeId)>,
    embeddings: HashMap<NodeId, EmbeddingVector>,
}

impl Partition {
    fn node(&self, label: NodeLabel, id: &NodeId) -> Option<&Properties> {
        self.nodes.get(&(label, id.clone()))
    }

    fn targets(&self, relation: Relation, from: &NodeId) -> Vec<Properties> {
        self.edges
            .iter()
            .filter(|(rel, source, _)| *rel == relation && source == from)
            .filter_map(|(_, _, target)| self.node(relation.target(), target))
            .map(public_properties)
            .collect()
    }

    fn sources(&self, relation: Relation, to: &NodeId) -> Vec<Properties> {
        self.edges
            .iter()
            .filter(|(rel, _, target)| *rel == relation && target == to)
            .filter_map(|(_, source, _)| self.node(relation.source(), source))
            .map(public_properties)
            .collect()
    }

    fn active_policies(&self) -> impl Iterator<Item = (&NodeId, &Properties)> {
        self.nodes
            .iter()
            .filter(|((label, _), props)| *label == NodeLabel::Policy && is_active(props))
            .map(|((_, id), props)| (id, props))
    }
}

type Partitions = Arc<RwLock<HashMap<String, Partition>>>;

/// Graph store backed by process memory.
///
/// Each named database is a separate partition of one shared map, so handles
/// returned by [`GraphStore::scoped`] observe each other's writes.
#[derive(Clone, Debug)]
pub struct InMemoryGraphStore {
    database: String,
    partitions: Partitions,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    /// Creates an empty store bound to the default database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_owned(),
            partitions: Arc::default(),
        }
    }

    /// Returns a handle bound to `database` sharing this store's data.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            partitions: Arc::clone(&self.partitions),
        }
    }

    /// Number of nodes stored in this handle's database.
    pub async fn node_count(&self) -> usize {
        let guard = self.partitions.read().await;
        guard.get(&self.database).map_or(0, |partition| partition.nodes.len())
    }

    /// Number of relationships stored in this handle's database.
    pub async fn edge_count(&self) -> usize {
        let guard = self.partitions.read().await;
        guard.get(&self.database).map_or(0, |partition| partition.edges.len())
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn scoped(&self, database: &str) -> GraphResult<Arc<dyn GraphStore>> {
        Ok(Arc::new(self.with_database(database)))
    }

    async fn upsert_node(
        &self,
        label: NodeLabel,
        id: &NodeId,
        props: Properties,
    ) -> GraphResult<()> {
        let mut guard = self.partitions.write().await;
        let partition = guard.entry(self.database.clone()).or_default();
        let node = partition
            .nodes
            .entry((label, id.clone()))
            .or_insert_with(|| {
                let mut fresh = Properties::new();
                fresh.insert("id".into(), Value::String(id.to_string()));
                fresh
            });

        for (key, value) in writable_properties(props) {
            if value.is_null() {
                node.remove(&key);
            } else {
                node.insert(key, value);
            }
        }
        Ok(())
    }

    async fn link(&self, relation: Relation, from: &NodeId, to: &NodeId) -> GraphResult<bool> {
        let mut guard = self.partitions.write().await;
        let Some(partition) = guard.get_mut(&self.database) else {
            return Ok(false);
        };
        if partition.node(relation.source(), from).is_none()
            || partition.node(relation.target(), to).is_none()
        {
            return Ok(false);
        }
        partition
            .edges
            .insert((relation, from.clone(), to.clone()));
        Ok(true)
    }

    async fn get_node(&self, label: NodeLabel, id: &NodeId) -> GraphResult<Option<Properties>> {
        let guard = self.partitions.read().await;
        Ok(guard
            .get(&self.database)
            .and_then(|partition| partition.node(label, id))
            .map(public_properties))
    }

    async fn decision_trace(&self, id: &NodeId) -> GraphResult<Option<DecisionTrace>> {
        let guard = self.partitions.read().await;
        let Some(partition) = guard.get(&self.database) else {
            return Ok(None);
        };
        let Some(decision) = partition.node(NodeLabel::Decision, id) else {
            return Ok(None);
        };

        Ok(Some(DecisionTrace {
            decision: public_properties(decision),
            actors: partition.sources(Relation::Made, id),
            evidence: partition.targets(Relation::JustifiedBy, id),
            policies_followed: partition.targets(Relation::Follows, id),
            policies_overridden: partition.targets(Relation::Overrides, id),
            approvals: partition.sources(Relation::Approved, id),
        }))
    }

    async fn policies_by_tags(&self, tags: &[String]) -> GraphResult<Vec<Properties>> {
        let guard = self.partitions.read().await;
        let Some(partition) = guard.get(&self.database) else {
            return Ok(Vec::new());
        };

        let mut policies: Vec<Properties> = partition
            .active_policies()
            .filter(|(_, props)| {
                props
                    .get("tags")
                    .and_then(Value::as_array)
                    .is_some_and(|stored| {
                        stored
                            .iter()
                            .filter_map(Value::as_str)
                            .any(|tag| tags.iter().any(|wanted| wanted == tag))
                    })
            })
            .map(|(_, props)| public_properties(props))
            .collect();
        sort_policies(&mut policies);
        Ok(policies)
    }

    async fn policies_by_category(&self, category: &str) -> GraphResult<Vec<Properties>> {
        let guard = self.partitions.read().await;
        let Some(partition) = guard.get(&self.database) else {
            return Ok(Vec::new());
        };

        let categories: Vec<&NodeId> = partition
            .nodes
            .iter()
            .filter(|((label, id), props)| {
                *label == NodeLabel::PolicyCategory
                    && (id.as_str() == category || text(props, "name") == category)
            })
            .map(|((_, id), _)| id)
            .collect();

        let mut policies: Vec<Properties> = partition
            .active_policies()
            .filter(|(id, _)| {
                categories.iter().any(|category_id| {
                    partition.edges.contains(&(
                        Relation::PartOf,
                        (*id).clone(),
                        (*category_id).clone(),
                    ))
                })
            })
            .map(|(_, props)| public_properties(props))
            .collect();
        sort_policies(&mut policies);
        Ok(policies)
    }

    async fn set_embedding(&self, id: &NodeId, embedding: &EmbeddingVector) -> GraphResult<bool> {
        let mut guard = self.partitions.write().await;
        let Some(partition) = guard.get_mut(&self.database) else {
            return Ok(false);
        };
        if partition.node(NodeLabel::Decision, id).is_none() {
            return Ok(false);
        }
        partition.embeddings.insert(id.clone(), embedding.clone());
        Ok(true)
    }

    async fn embedded_decisions(&self) -> GraphResult<Vec<(Properties, EmbeddingVector)>> {
        let guard = self.partitions.read().await;
        let Some(partition) = guard.get(&self.database) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .embeddings
            .iter()
            .filter_map(|(id, embedding)| {
                partition
                    .node(NodeLabel::Decision, id)
                    .map(|props| (public_properties(props), embedding.clone()))
            })
            .collect())
    }
}
