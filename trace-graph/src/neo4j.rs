//! Neo4j-backed graph store speaking Bolt through `neo4rs`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder, Graph, Query, Row, query,
};
use serde_json::{Number, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};
use trace_primitives::{NodeId, NodeLabel, Properties, Relation, public_properties};

use crate::store::{DEFAULT_DATABASE, GraphStore, writable_properties};
use crate::{DecisionTrace, EmbeddingVector, GraphError, GraphResult};

const SEVERITY_ORDER: &str = "CASE p.severity WHEN 'strict' THEN 3 WHEN 'moderate' THEN 2 \
                              WHEN 'flexible' THEN 1 ELSE 0 END DESC, p.id";

const ACTIVE_FILTER: &str = "coalesce(p.active, true) = true";

const TRACE_QUERY: &str = "MATCH (d:Decision {id: $id}) \
     OPTIONAL MATCH (a:Actor)-[:MADE]->(d) \
     WITH d, collect(DISTINCT properties(a)) AS actors \
     OPTIONAL MATCH (d)-[:JUSTIFIED_BY]->(e:Evidence) \
     WITH d, actors, collect(DISTINCT properties(e)) AS evidence \
     OPTIONAL MATCH (d)-[:FOLLOWS]->(f:Policy) \
     WITH d, actors, evidence, collect(DISTINCT properties(f)) AS followed \
     OPTIONAL MATCH (d)-[:OVERRIDES]->(o:Policy) \
     WITH d, actors, evidence, followed, collect(DISTINCT properties(o)) AS overridden \
     OPTIONAL MATCH (ap:Approval)-[:APPROVED]->(d) \
     RETURN properties(d) AS decision, actors, evidence, followed, overridden, \
            collect(DISTINCT properties(ap)) AS approvals";

/// Connection settings for [`Neo4jGraphStore`].
#[derive(Clone)]
pub struct Neo4jSettings {
    /// Bolt URI, e.g. `neo4j+s://xxxx.databases.neo4j.io`.
    pub uri: String,
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database used by the root handle.
    pub database: String,
    /// Maximum pooled connections per database.
    pub max_connections: usize,
}

impl Neo4jSettings {
    /// Creates settings for the default database.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            database: DEFAULT_DATABASE.to_owned(),
            max_connections: 16,
        }
    }

    /// Binds the root handle to `database`.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    fn validate(&self) -> GraphResult<()> {
        for (field, value) in [
            ("uri", &self.uri),
            ("user", &self.user),
            ("password", &self.password),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(GraphError::InvalidConfig {
                    reason: format!("neo4j {field} must not be empty"),
                });
            }
        }
        if self.max_connections == 0 {
            return Err(GraphError::InvalidConfig {
                reason: "neo4j max_connections must be positive".into(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Neo4jSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jSettings")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

/// Graph store backed by a Neo4j database.
///
/// Similarity search runs client-side over stored embeddings, so no vector
/// index is required on the server.
#[derive(Clone)]
pub struct Neo4jGraphStore {
    settings: Arc<Neo4jSettings>,
    database: String,
    graph: Graph,
    pools: Arc<Mutex<HashMap<String, Graph>>>,
}

impl fmt::Debug for Neo4jGraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jGraphStore")
            .field("uri", &self.settings.uri)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Neo4jGraphStore {
    /// Connects to Neo4j using `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] for incomplete settings and
    /// [`GraphError::Connection`] when the driver cannot connect.
    pub async fn connect(settings: Neo4jSettings) -> GraphResult<Self> {
        settings.validate()?;
        let graph = open_graph(&settings, &settings.database).await?;
        info!(uri = %settings.uri, database = %settings.database, "connected to neo4j");

        let database = settings.database.clone();
        let pools = HashMap::from([(database.clone(), graph.clone())]);
        Ok(Self {
            settings: Arc::new(settings),
            database,
            graph,
            pools: Arc::new(Mutex::new(pools)),
        })
    }

    async fn rows(&self, q: Query) -> GraphResult<Vec<Row>> {
        let mut stream = self.graph.execute(q).await.map_err(GraphError::backend)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(GraphError::backend)? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn first_row(&self, q: Query) -> GraphResult<Option<Row>> {
        Ok(self.rows(q).await?.into_iter().next())
    }

    async fn count(&self, q: Query, column: &str) -> GraphResult<i64> {
        match self.first_row(q).await? {
            Some(row) => row.get::<i64>(column).map_err(GraphError::decode),
            None => Ok(0),
        }
    }

    async fn policy_rows(&self, q: Query) -> GraphResult<Vec<Properties>> {
        self.rows(q)
            .await?
            .iter()
            .map(|row| properties_column(row, "props"))
            .collect()
    }
}

async fn open_graph(settings: &Neo4jSettings, database: &str) -> GraphResult<Graph> {
    let config = ConfigBuilder::default()
        .uri(settings.uri.as_str())
        .user(settings.user.as_str())
        .password(settings.password.as_str())
        .db(database)
        .max_connections(settings.max_connections)
        .build()
        .map_err(|err| GraphError::InvalidConfig {
            reason: err.to_string(),
        })?;
    Graph::connect(config)
        .await
        .map_err(|err| GraphError::Connection {
            reason: err.to_string(),
        })
}

#[async_trait]
impl GraphStore for Neo4jGraphStore {
    fn database(&self) -> &str {
        &self.database
    }

    async fn scoped(&self, database: &str) -> GraphResult<Arc<dyn GraphStore>> {
        if database.trim().is_empty() {
            return Err(GraphError::InvalidConfig {
                reason: "database name must not be empty".into(),
            });
        }
        let mut pools = self.pools.lock().await;
        let graph = match pools.get(database) {
            Some(graph) => graph.clone(),
            None => {
                debug!(database, "opening neo4j database pool");
                let graph = open_graph(&self.settings, database).await?;
                pools.insert(database.to_owned(), graph.clone());
                graph
            }
        };
        Ok(Arc::new(Self {
            settings: Arc::clone(&self.settings),
            database: database.to_owned(),
            graph,
            pools: Arc::clone(&self.pools),
        }))
    }

    async fn upsert_node(
        &self,
        label: NodeLabel,
        id: &NodeId,
        props: Properties,
    ) -> GraphResult<()> {
        let cypher = format!("MERGE (n:{label} {{id: $id}}) SET n += $props");
        let q = query(&cypher)
            .param("id", id.as_str())
            .param("props", properties_to_bolt(writable_properties(props)));
        self.graph.run(q).await.map_err(GraphError::backend)
    }

    async fn link(&self, relation: Relation, from: &NodeId, to: &NodeId) -> GraphResult<bool> {
        let cypher = format!(
            "MATCH (a:{source} {{id: $from}}), (b:{target} {{id: $to}}) \
             MERGE (a)-[r:{relation}]->(b) RETURN count(r) AS linked",
            source = relation.source(),
            target = relation.target(),
        );
        let q = query(&cypher)
            .param("from", from.as_str())
            .param("to", to.as_str());
        Ok(self.count(q, "linked").await? > 0)
    }

    async fn get_node(&self, label: NodeLabel, id: &NodeId) -> GraphResult<Option<Properties>> {
        let cypher = format!("MATCH (n:{label} {{id: $id}}) RETURN properties(n) AS props LIMIT 1");
        let q = query(&cypher).param("id", id.as_str());
        self.first_row(q)
            .await?
            .map(|row| properties_column(&row, "props"))
            .transpose()
    }

    async fn decision_trace(&self, id: &NodeId) -> GraphResult<Option<DecisionTrace>> {
        let q = query(TRACE_QUERY).param("id", id.as_str());
        let Some(row) = self.first_row(q).await? else {
            return Ok(None);
        };
        Ok(Some(DecisionTrace {
            decision: properties_column(&row, "decision")?,
            actors: properties_list(&row, "actors")?,
            evidence: properties_list(&row, "evidence")?,
            policies_followed: properties_list(&row, "followed")?,
            policies_overridden: properties_list(&row, "overridden")?,
            approvals: properties_list(&row, "approvals")?,
        }))
    }

    async fn policies_by_tags(&self, tags: &[String]) -> GraphResult<Vec<Properties>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let cypher = format!(
            "MATCH (p:Policy) \
             WHERE any(tag IN $tags WHERE tag IN coalesce(p.tags, [])) AND {ACTIVE_FILTER} \
             RETURN properties(p) AS props ORDER BY {SEVERITY_ORDER}"
        );
        let q = query(&cypher).param("tags", tags.to_vec());
        self.policy_rows(q).await
    }

    async fn policies_by_category(&self, category: &str) -> GraphResult<Vec<Properties>> {
        let cypher = format!(
            "MATCH (p:Policy)-[:PART_OF]->(c:PolicyCategory) \
             WHERE (c.id = $category OR c.name = $category) AND {ACTIVE_FILTER} \
             WITH DISTINCT p \
             RETURN properties(p) AS props ORDER BY {SEVERITY_ORDER}"
        );
        let q = query(&cypher).param("category", category);
        self.policy_rows(q).await
    }

    async fn set_embedding(&self, id: &NodeId, embedding: &EmbeddingVector) -> GraphResult<bool> {
        let q = query(
            "MATCH (d:Decision {id: $id}) SET d.embedding = $embedding RETURN count(d) AS updated",
        )
        .param("id", id.as_str())
        .param("embedding", embedding.to_f64());
        Ok(self.count(q, "updated").await? > 0)
    }

    async fn embedded_decisions(&self) -> GraphResult<Vec<(Properties, EmbeddingVector)>> {
        let q = query(
            "MATCH (d:Decision) WHERE d.embedding IS NOT NULL \
             RETURN properties(d) AS props, d.embedding AS embedding",
        );
        let rows = self.rows(q).await?;
        let mut decisions = Vec::with_capacity(rows.len());
        for row in &rows {
            let props = properties_column(row, "props")?;
            let values: Vec<f64> = row.get("embedding").map_err(GraphError::decode)?;
            match EmbeddingVector::from_f64(&values) {
                Ok(embedding) => decisions.push((props, embedding)),
                Err(err) => debug!(error = %err, "skipping decision with unusable embedding"),
            }
        }
        Ok(decisions)
    }
}

fn properties_column(row: &Row, column: &str) -> GraphResult<Properties> {
    let value: BoltType = row.get(column).map_err(GraphError::decode)?;
    match bolt_to_json(value) {
        Value::Object(map) => Ok(public_properties(&map)),
        other => Err(GraphError::decode(format!(
            "column `{column}` is not a map: {other}"
        ))),
    }
}

fn properties_list(row: &Row, column: &str) -> GraphResult<Vec<Properties>> {
    let value: BoltType = row.get(column).map_err(GraphError::decode)?;
    match bolt_to_json(value) {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(public_properties(&map)),
                _ => None,
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(GraphError::decode(format!(
            "column `{column}` is not a list: {other}"
        ))),
    }
}

fn properties_to_bolt(props: Properties) -> BoltType {
    let mut map = BoltMap::new();
    for (key, value) in props {
        map.put(BoltString::from(key.as_str()), json_to_bolt(value));
    }
    BoltType::Map(map)
}

fn json_to_bolt(value: Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(flag) => BoltType::Boolean(BoltBoolean::new(flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => BoltType::Integer(BoltInteger::new(int)),
            None => BoltType::Float(BoltFloat::new(number.as_f64().unwrap_or_default())),
        },
        Value::String(text) => BoltType::String(BoltString::from(text.as_str())),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(map) => BoltType::String(BoltString::from(
            Value::Object(map).to_string().as_str(),
        )),
    }
}

fn bolt_to_json(value: BoltType) -> Value {
    match value {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(flag) => Value::Bool(flag.value),
        BoltType::Integer(int) => Value::from(int.value),
        BoltType::Float(float) => Number::from_f64(float.value).map_or(Value::Null, Value::Number),
        BoltType::String(text) => Value::String(text.value),
        BoltType::List(list) => Value::Array(list.value.into_iter().map(bolt_to_json).collect()),
        BoltType::Map(map) => Value::Object(
            map.value
                .into_iter()
                .map(|(key, value)| (key.value, bolt_to_json(value)))
                .collect(),
        ),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_values_round_trip_through_bolt() {
        let props = json!({
            "name": "Standard Refund",
            "max_amount": 500,
            "ratio": 0.25,
            "active": true,
            "tags": ["refund", "standard"],
            "gone": null
        });
        let Value::Object(map) = props.clone() else {
            unreachable!()
        };

        let back = bolt_to_json(properties_to_bolt(map));
        assert_eq!(back, props);
    }

    #[test]
    fn nested_objects_are_sent_as_strings() {
        let bolt = json_to_bolt(json!({ "a": 1 }));
        assert_eq!(bolt_to_json(bolt), json!("{\"a\":1}"));
    }

    #[test]
    fn settings_reject_blank_fields() {
        let err = Neo4jSettings::new("neo4j://localhost:7687", "neo4j", " ")
            .validate()
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig { .. }));

        let settings = Neo4jSettings::new("neo4j://localhost:7687", "neo4j", "secret")
            .with_database("decisions");
        settings.validate().unwrap();
        assert!(!format!("{settings:?}").contains("secret"));
    }
}
