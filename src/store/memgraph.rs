use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType, ConfigBuilder, Graph,
    query,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::core::records::{Entity, Properties, Relationship};
use crate::store::query::CanonicalQuery;
use crate::store::{GraphStore, QueryRow, StoreError, UpsertOutcome};

/// Record properties are stored flat on the node/edge under this prefix so they
/// never collide with `id`, `label`, `type` or `confidence`.
const PROPERTY_PREFIX: &str = "prop_";

#[derive(Clone, Debug)]
pub struct MemgraphConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: usize,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl Default for MemgraphConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: String::new(),
            password: String::new(),
            database: "memgraph".to_string(),
            max_connections: 50,
            connect_timeout: Duration::from_millis(15_000),
            query_timeout: Duration::from_millis(30_000),
        }
    }
}

/// Memgraph over Bolt. Every entity is a node labeled `Entity` plus its type;
/// every relationship an edge typed by its relationship type.
pub struct MemgraphStore {
    cfg: MemgraphConfig,
    graph: RwLock<Option<Graph>>,
}

fn backend(err: neo4rs::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(0.0))),
        },
        Value::String(s) => BoltType::String(BoltString::from(s.clone())),
        Value::Array(items) => BoltType::List(BoltList::from(items.iter().map(json_to_bolt).collect::<Vec<_>>())),
        Value::Object(obj) => {
            let map: BoltMap = obj
                .iter()
                .map(|(k, v)| (BoltString::from(k.clone()), json_to_bolt(v)))
                .collect();
            BoltType::Map(map)
        }
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

/// Graph properties hold scalars or homogeneous scalar lists only: nested values
/// are stored as JSON text and nulls are dropped.
fn flatten_properties(props: &Properties) -> Map<String, Value> {
    let mut out = Map::with_capacity(props.len());
    for (k, v) in props {
        let stored = match v {
            Value::Null => continue,
            Value::Array(items) if items.iter().all(is_scalar) => v.clone(),
            Value::Array(_) | Value::Object(_) => Value::String(v.to_string()),
            _ => v.clone(),
        };
        out.insert(format!("{PROPERTY_PREFIX}{k}"), stored);
    }
    out
}

/// Undo [`flatten_properties`] on a returned `{id, ..., properties}` map,
/// recursing through lists (paths).
fn restore_records(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(restore_records).collect()),
        Value::Object(mut obj) if obj.contains_key("id") && obj.contains_key("properties") => {
            if let Some(Value::Object(stored)) = obj.remove("properties") {
                let restored: Map<String, Value> = stored
                    .into_iter()
                    .filter_map(|(k, v)| k.strip_prefix(PROPERTY_PREFIX).map(|k| (k.to_string(), v)))
                    .collect();
                obj.insert("properties".to_string(), Value::Object(restored));
            }
            Value::Object(obj)
        }
        other => other,
    }
}

impl MemgraphStore {
    pub fn new(cfg: MemgraphConfig) -> Self {
        Self {
            cfg,
            graph: RwLock::new(None),
        }
    }

    async fn graph(&self) -> Result<Graph, StoreError> {
        self.graph.read().await.clone().ok_or(StoreError::NotConnected)
    }

    /// Run `cypher` and collect `fields` from each row, bounded by the query timeout.
    async fn run_rows(
        &self,
        cypher: &str,
        params: Map<String, Value>,
        fields: &[&str],
    ) -> Result<Vec<QueryRow>, StoreError> {
        let graph = self.graph().await?;
        let mut q = query(cypher);
        for (k, v) in &params {
            q = q.param(k.as_str(), json_to_bolt(v));
        }

        let work = async {
            let mut result = graph.execute(q).await?;
            let mut rows: Vec<QueryRow> = Vec::new();
            while let Some(row) = result.next().await? {
                let mut out = QueryRow::with_capacity(fields.len());
                for field in fields {
                    let v = row.get::<Value>(field).unwrap_or(Value::Null);
                    out.insert(field.to_string(), restore_records(v));
                }
                rows.push(out);
            }
            Ok::<_, neo4rs::Error>(rows)
        };

        match tokio::time::timeout(self.cfg.query_timeout, work).await {
            Ok(r) => r.map_err(backend),
            Err(_) => {
                tracing::warn!(timeout = ?self.cfg.query_timeout, "memgraph query timed out");
                Err(StoreError::Timeout(self.cfg.query_timeout))
            }
        }
    }

    async fn count_field(&self, cypher: &str, params: Map<String, Value>, field: &str) -> Result<i64, StoreError> {
        let rows = self.run_rows(cypher, params, &[field]).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get(field))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl GraphStore for MemgraphStore {
    fn backend_name(&self) -> &'static str {
        "memgraph"
    }

    async fn connect(&self) -> Result<(), StoreError> {
        let config = ConfigBuilder::default()
            .uri(self.cfg.uri.clone())
            .user(self.cfg.username.clone())
            .password(self.cfg.password.clone())
            .db(self.cfg.database.clone())
            .max_connections(self.cfg.max_connections)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let graph = match tokio::time::timeout(self.cfg.connect_timeout, Graph::connect(config)).await {
            Ok(r) => r.map_err(|e| StoreError::Connection(e.to_string()))?,
            Err(_) => {
                return Err(StoreError::Connection(format!(
                    "connect timeout after {:?}",
                    self.cfg.connect_timeout
                )));
            }
        };
        *self.graph.write().await = Some(graph);

        // fail fast on bad credentials rather than on the first upsert
        self.run_rows("RETURN 1 AS n", Map::new(), &["n"])
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        if let Err(err) = self.run_rows("CREATE INDEX ON :Entity(id)", Map::new(), &[]).await {
            tracing::debug!(error = %err, "entity id index not created");
        }
        tracing::info!(uri = %self.cfg.uri, "connected to memgraph");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.graph.write().await.take();
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<UpsertOutcome, StoreError> {
        let cypher = format!(
            "OPTIONAL MATCH (existing:Entity {{id: $id}}) \
             WITH count(existing) AS found \
             MERGE (n:Entity {{id: $id}}) \
             ON CREATE SET n.label = $label, n.type = $type, n.confidence = $confidence \
             ON MATCH SET n.label = $label, \
               n.confidence = CASE WHEN $confidence > n.confidence THEN $confidence ELSE n.confidence END \
             SET n += $props \
             SET n:`{}` \
             RETURN found",
            entity.entity_type.as_str()
        );
        let mut params = Map::new();
        params.insert("id".to_string(), Value::String(entity.id.clone()));
        params.insert("label".to_string(), Value::String(entity.label.clone()));
        params.insert("type".to_string(), Value::String(entity.entity_type.as_str().to_string()));
        params.insert("confidence".to_string(), Value::from(entity.confidence));
        params.insert("props".to_string(), Value::Object(flatten_properties(&entity.properties)));

        let found = self.count_field(&cypher, params, "found").await?;
        Ok(if found > 0 {
            UpsertOutcome::Merged
        } else {
            UpsertOutcome::Created
        })
    }

    async fn upsert_relationship(&self, relationship: &Relationship) -> Result<UpsertOutcome, StoreError> {
        let mut endpoints = Map::new();
        endpoints.insert("sourceId".to_string(), Value::String(relationship.source_id.clone()));
        endpoints.insert("targetId".to_string(), Value::String(relationship.target_id.clone()));
        let present = self
            .run_rows(
                "OPTIONAL MATCH (s:Entity {id: $sourceId}) \
                 OPTIONAL MATCH (t:Entity {id: $targetId}) \
                 RETURN count(s) AS source, count(t) AS target",
                endpoints.clone(),
                &["source", "target"],
            )
            .await?;
        let row = present.first();
        for role in ["source", "target"] {
            let count = row.and_then(|r| r.get(role)).and_then(Value::as_i64).unwrap_or(0);
            if count == 0 {
                let endpoint_id = if role == "source" {
                    &relationship.source_id
                } else {
                    &relationship.target_id
                };
                return Err(StoreError::MissingEndpoint {
                    relationship_id: relationship.id.clone(),
                    role,
                    endpoint_id: endpoint_id.clone(),
                });
            }
        }

        let cypher = format!(
            "MATCH (s:Entity {{id: $sourceId}}), (t:Entity {{id: $targetId}}) \
             OPTIONAL MATCH (s)-[existing:`{rel}`]->(t) \
             WITH s, t, count(existing) AS found \
             MERGE (s)-[r:`{rel}`]->(t) \
             ON CREATE SET r.id = $id, r.confidence = $confidence \
             ON MATCH SET r.confidence = CASE WHEN $confidence > r.confidence THEN $confidence ELSE r.confidence END \
             SET r += $props \
             RETURN found",
            rel = relationship.rel_type.as_str()
        );
        let mut params = endpoints;
        params.insert("id".to_string(), Value::String(relationship.id.clone()));
        params.insert("confidence".to_string(), Value::from(relationship.confidence));
        params.insert(
            "props".to_string(),
            Value::Object(flatten_properties(&relationship.properties)),
        );

        let found = self.count_field(&cypher, params, "found").await?;
        Ok(if found > 0 {
            UpsertOutcome::Merged
        } else {
            UpsertOutcome::Created
        })
    }

    async fn query(&self, query: &CanonicalQuery) -> Result<Vec<QueryRow>, StoreError> {
        self.run_rows(&query.cypher(), query.parameters(), query.fields()).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.run_rows("MATCH (n) DETACH DELETE n", Map::new(), &[]).await?;
        tracing::info!("memgraph graph cleared");
        Ok(())
    }
}
