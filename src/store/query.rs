use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::types::EntityType;

/// Upper bound on the number of paths a shortest-path query returns.
pub const SHORTEST_PATH_LIMIT: usize = 5;

pub const DEFAULT_TOP_LIMIT: usize = 10;

/// The fixed repertoire of read queries every store answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CanonicalQuery {
    /// Rows `{n}`.
    AllEntities,
    /// Rows `{a, r, b}`.
    AllRelationships,
    /// Rows `{n}`.
    EntitiesOfType { entity_type: EntityType },
    /// Rows `{type, count}`.
    EntityTypeHistogram,
    /// Rows `{type, count}`.
    RelationshipTypeHistogram,
    /// Rows `{e, r, connected, direction}`.
    Neighbors { entity_id: String },
    /// Rows `{path, relationships, pathLength}`.
    ShortestPath { from_label: String, to_label: String },
    /// Rows `{n, connections}`.
    TopByDegree { limit: usize },
}

fn re_entities_of_type() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^match \(n:`?(\w+)`?\) return n$").unwrap())
}

/// Collapse whitespace and lowercase so formatting differences don't matter.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Cypher map literal for an entity node bound to `var`.
fn entity_map(var: &str) -> String {
    format!(
        "{{id: {var}.id, label: {var}.label, type: {var}.type, confidence: {var}.confidence, properties: properties({var})}}"
    )
}

/// Cypher map literal for a relationship bound to `var`.
fn relationship_map(var: &str) -> String {
    format!(
        "{{id: {var}.id, sourceId: startNode({var}).id, targetId: endNode({var}).id, type: type({var}), confidence: {var}.confidence, properties: properties({var})}}"
    )
}

impl CanonicalQuery {
    /// Field names of each returned row.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            CanonicalQuery::AllEntities | CanonicalQuery::EntitiesOfType { .. } => &["n"],
            CanonicalQuery::AllRelationships => &["a", "r", "b"],
            CanonicalQuery::EntityTypeHistogram | CanonicalQuery::RelationshipTypeHistogram => &["type", "count"],
            CanonicalQuery::Neighbors { .. } => &["e", "r", "connected", "direction"],
            CanonicalQuery::ShortestPath { .. } => &["path", "relationships", "pathLength"],
            CanonicalQuery::TopByDegree { .. } => &["n", "connections"],
        }
    }

    /// The textual form accepted by [`CanonicalQuery::from_cypher`].
    pub fn canonical_text(&self) -> String {
        match self {
            CanonicalQuery::AllEntities => "MATCH (n) RETURN n".to_string(),
            CanonicalQuery::AllRelationships => "MATCH (a)-[r]->(b) RETURN a, r, b".to_string(),
            CanonicalQuery::EntitiesOfType { entity_type } => format!("MATCH (n:{entity_type}) RETURN n"),
            CanonicalQuery::EntityTypeHistogram => {
                "MATCH (n) RETURN labels(n)[0] as type, count(*) as count".to_string()
            }
            CanonicalQuery::RelationshipTypeHistogram => {
                "MATCH ()-[r]->() RETURN type(r) as type, count(*) as count".to_string()
            }
            CanonicalQuery::Neighbors { .. } => "MATCH (e {id: $entityId})-[r]-(connected) RETURN e, r, connected".to_string(),
            CanonicalQuery::ShortestPath { .. } => "MATCH (from {label: $fromLabel}), (to {label: $toLabel}) \
                 MATCH path = shortestPath((from)-[*]-(to)) \
                 RETURN path, length(path) as pathLength ORDER BY pathLength LIMIT 5"
                .to_string(),
            CanonicalQuery::TopByDegree { .. } => "MATCH (n)-[r]-() WITH n, count(r) as connections \
                 RETURN n, connections ORDER BY connections DESC LIMIT $limit"
                .to_string(),
        }
    }

    /// Bound parameters for both the canonical and the executable text.
    pub fn parameters(&self) -> Map<String, Value> {
        let mut p = Map::new();
        match self {
            CanonicalQuery::EntitiesOfType { entity_type } => {
                p.insert("type".to_string(), Value::String(entity_type.as_str().to_string()));
            }
            CanonicalQuery::Neighbors { entity_id } => {
                p.insert("entityId".to_string(), Value::String(entity_id.clone()));
            }
            CanonicalQuery::ShortestPath { from_label, to_label } => {
                p.insert("fromLabel".to_string(), Value::String(from_label.clone()));
                p.insert("toLabel".to_string(), Value::String(to_label.clone()));
            }
            CanonicalQuery::TopByDegree { limit } => {
                p.insert("limit".to_string(), Value::from(*limit as u64));
            }
            _ => {}
        }
        p
    }

    /// Executable Memgraph text. Nodes carry the `Entity` label and their type
    /// in `type`; rows come back as plain maps in the shapes above.
    pub fn cypher(&self) -> String {
        let n = entity_map("n");
        match self {
            CanonicalQuery::AllEntities => format!("MATCH (n:Entity) WITH n ORDER BY n.id RETURN {n} AS n"),
            CanonicalQuery::EntitiesOfType { .. } => {
                format!("MATCH (n:Entity) WHERE n.type = $type WITH n ORDER BY n.id RETURN {n} AS n")
            }
            CanonicalQuery::AllRelationships => format!(
                "MATCH (a:Entity)-[r]->(b:Entity) WITH a, r, b ORDER BY r.id RETURN {} AS a, {} AS r, {} AS b",
                entity_map("a"),
                relationship_map("r"),
                entity_map("b"),
            ),
            CanonicalQuery::EntityTypeHistogram => {
                "MATCH (n:Entity) RETURN n.type AS type, count(*) AS count ORDER BY type".to_string()
            }
            CanonicalQuery::RelationshipTypeHistogram => {
                "MATCH (:Entity)-[r]->(:Entity) RETURN type(r) AS type, count(*) AS count ORDER BY type".to_string()
            }
            CanonicalQuery::Neighbors { .. } => format!(
                "MATCH (e:Entity {{id: $entityId}})-[r]-(connected:Entity) \
                 WITH e, r, connected ORDER BY r.id \
                 RETURN {} AS e, {} AS r, {} AS connected, \
                 CASE WHEN startNode(r) = e THEN 'outgoing' ELSE 'incoming' END AS direction",
                entity_map("e"),
                relationship_map("r"),
                entity_map("connected"),
            ),
            CanonicalQuery::ShortestPath { .. } => format!(
                "MATCH (from:Entity {{label: $fromLabel}}), (to:Entity {{label: $toLabel}}) WHERE from <> to \
                 MATCH path = (from)-[*BFS]-(to) \
                 RETURN [x IN nodes(path) | {}] AS path, \
                 [y IN relationships(path) | {}] AS relationships, \
                 size(relationships(path)) AS pathLength \
                 ORDER BY pathLength LIMIT {SHORTEST_PATH_LIMIT}",
                entity_map("x"),
                relationship_map("y"),
            ),
            CanonicalQuery::TopByDegree { .. } => format!(
                "MATCH (n:Entity)-[r]-() WITH n, count(r) AS connections \
                 ORDER BY connections DESC, n.id LIMIT $limit \
                 RETURN {n} AS n, connections"
            ),
        }
    }

    /// Recognize the canonical text of one of the query shapes.
    ///
    /// Parameters are taken from `params` (`entityId`, `fromLabel`, `toLabel`, `limit`).
    /// Anything else, including a known shape with missing parameters, yields `None`.
    pub fn from_cypher(text: &str, params: &Map<String, Value>) -> Option<Self> {
        let wanted = normalize(text);
        let str_param = |k: &str| params.get(k).and_then(Value::as_str).map(str::to_string);

        if let Some(m) = re_entities_of_type().captures(&wanted) {
            let entity_type = m[1].parse::<EntityType>().ok()?;
            return Some(CanonicalQuery::EntitiesOfType { entity_type });
        }

        let shapes = [
            CanonicalQuery::AllEntities,
            CanonicalQuery::AllRelationships,
            CanonicalQuery::EntityTypeHistogram,
            CanonicalQuery::RelationshipTypeHistogram,
            CanonicalQuery::Neighbors { entity_id: String::new() },
            CanonicalQuery::ShortestPath {
                from_label: String::new(),
                to_label: String::new(),
            },
            CanonicalQuery::TopByDegree { limit: 0 },
        ];
        let shape = shapes.into_iter().find(|s| normalize(&s.canonical_text()) == wanted)?;

        match shape {
            CanonicalQuery::Neighbors { .. } => Some(CanonicalQuery::Neighbors {
                entity_id: str_param("entityId")?,
            }),
            CanonicalQuery::ShortestPath { .. } => Some(CanonicalQuery::ShortestPath {
                from_label: str_param("fromLabel")?,
                to_label: str_param("toLabel")?,
            }),
            CanonicalQuery::TopByDegree { .. } => {
                let limit = params.get("limit").and_then(Value::as_u64)?;
                Some(CanonicalQuery::TopByDegree { limit: limit as usize })
            }
            other => Some(other),
        }
    }
}
