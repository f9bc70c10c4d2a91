use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use serde_json::Value;

use crate::core::records::{Entity, Relationship};
use crate::core::types::RelationshipType;
use crate::store::query::{CanonicalQuery, SHORTEST_PATH_LIMIT};
use crate::store::{GraphStore, QueryRow, StoreError, UpsertOutcome};

type EdgeKey = (String, RelationshipType, String);

#[derive(Debug, Default)]
struct GraphState {
    entities: BTreeMap<String, Entity>,
    relationships: BTreeMap<String, Relationship>,
    /// (source, type, target) → relationship id
    edge_index: HashMap<EdgeKey, String>,
}

/// Process-local store. One mutex guards the whole graph; ordered maps keep
/// query results deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<GraphState>,
}

fn to_json<T: Serialize>(value: &T, id: &str) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::InvalidRecord {
        id: id.to_string(),
        reason: e.to_string(),
    })
}

fn row<const N: usize>(fields: [(&str, Value); N]) -> QueryRow {
    fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entity_count(&self) -> usize {
        self.lock().entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.lock().relationships.len()
    }

    pub fn entity(&self, id: &str) -> Option<Entity> {
        self.lock().entities.get(id).cloned()
    }

    pub fn relationship(&self, id: &str) -> Option<Relationship> {
        self.lock().relationships.get(id).cloned()
    }
}

impl GraphState {
    fn entity_rows<'a>(&self, entities: impl Iterator<Item = &'a Entity>) -> Result<Vec<QueryRow>, StoreError> {
        entities
            .map(|e| -> Result<QueryRow, StoreError> { Ok(row([("n", to_json(e, &e.id)?)])) })
            .collect()
    }

    fn all_relationships(&self) -> Result<Vec<QueryRow>, StoreError> {
        let mut out = Vec::with_capacity(self.relationships.len());
        for r in self.relationships.values() {
            let (Some(a), Some(b)) = (self.entities.get(&r.source_id), self.entities.get(&r.target_id)) else {
                continue;
            };
            out.push(row([
                ("a", to_json(a, &a.id)?),
                ("r", to_json(r, &r.id)?),
                ("b", to_json(b, &b.id)?),
            ]));
        }
        Ok(out)
    }

    fn histogram(counts: BTreeMap<&'static str, usize>) -> Vec<QueryRow> {
        counts
            .into_iter()
            .map(|(t, c)| row([("type", Value::from(t)), ("count", Value::from(c as u64))]))
            .collect()
    }

    fn neighbors(&self, entity_id: &str) -> Result<Vec<QueryRow>, StoreError> {
        let Some(e) = self.entities.get(entity_id) else {
            return Ok(Vec::new());
        };
        let e_json = to_json(e, &e.id)?;
        let mut out = Vec::new();
        for r in self.relationships.values() {
            let (other, direction) = if r.source_id == entity_id {
                (&r.target_id, "outgoing")
            } else if r.target_id == entity_id {
                (&r.source_id, "incoming")
            } else {
                continue;
            };
            let Some(connected) = self.entities.get(other) else {
                continue;
            };
            out.push(row([
                ("e", e_json.clone()),
                ("r", to_json(r, &r.id)?),
                ("connected", to_json(connected, &connected.id)?),
                ("direction", Value::from(direction)),
            ]));
        }
        Ok(out)
    }

    /// Undirected hop-count shortest paths from each entity labeled `from` to
    /// the nearest entity labeled `to`, shortest first.
    fn shortest_paths(&self, from: &str, to: &str) -> Result<Vec<QueryRow>, StoreError> {
        let mut graph: UnGraph<&str, &str> = UnGraph::new_undirected();
        let mut index: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.entities.len());
        for id in self.entities.keys() {
            index.insert(id.as_str(), graph.add_node(id.as_str()));
        }
        for r in self.relationships.values() {
            if let (Some(&a), Some(&b)) = (index.get(r.source_id.as_str()), index.get(r.target_id.as_str())) {
                graph.add_edge(a, b, r.id.as_str());
            }
        }

        let sources: Vec<NodeIndex> = self
            .entities
            .values()
            .filter(|e| e.label == from)
            .filter_map(|e| index.get(e.id.as_str()).copied())
            .collect();
        let targets: HashSet<NodeIndex> = self
            .entities
            .values()
            .filter(|e| e.label == to)
            .filter_map(|e| index.get(e.id.as_str()).copied())
            .collect();
        if sources.is_empty() || targets.is_empty() {
            return Ok(Vec::new());
        }

        let mut found: Vec<(usize, Vec<NodeIndex>)> = sources
            .iter()
            .filter_map(|&src| {
                petgraph::algo::astar(&graph, src, |n| n != src && targets.contains(&n), |_| 1usize, |_| 0)
            })
            .collect();
        found.sort_by_key(|(cost, _)| *cost);
        found.truncate(SHORTEST_PATH_LIMIT);

        let mut out = Vec::with_capacity(found.len());
        for (cost, nodes) in found {
            let mut path = Vec::with_capacity(nodes.len());
            for n in &nodes {
                let id = graph[*n];
                if let Some(e) = self.entities.get(id) {
                    path.push(to_json(e, id)?);
                }
            }
            let mut rels = Vec::with_capacity(cost);
            for pair in nodes.windows(2) {
                let Some(edge) = graph.find_edge(pair[0], pair[1]) else {
                    continue;
                };
                let rel_id = graph[edge];
                if let Some(r) = self.relationships.get(rel_id) {
                    rels.push(to_json(r, rel_id)?);
                }
            }
            out.push(row([
                ("path", Value::Array(path)),
                ("relationships", Value::Array(rels)),
                ("pathLength", Value::from(cost as u64)),
            ]));
        }
        Ok(out)
    }

    fn top_by_degree(&self, limit: usize) -> Result<Vec<QueryRow>, StoreError> {
        let mut degree: HashMap<&str, usize> = HashMap::new();
        for r in self.relationships.values() {
            *degree.entry(r.source_id.as_str()).or_insert(0) += 1;
            if r.target_id != r.source_id {
                *degree.entry(r.target_id.as_str()).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = degree
            .into_iter()
            .filter(|(id, _)| self.entities.contains_key(*id))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(limit);

        let mut out = Vec::with_capacity(ranked.len());
        for (id, connections) in ranked {
            if let Some(e) = self.entities.get(id) {
                out.push(row([
                    ("n", to_json(e, id)?),
                    ("connections", Value::from(connections as u64)),
                ]));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl GraphStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<UpsertOutcome, StoreError> {
        if entity.id.trim().is_empty() {
            return Err(StoreError::InvalidRecord {
                id: entity.label.clone(),
                reason: "empty entity id".to_string(),
            });
        }
        let mut state = self.lock();
        match state.entities.get_mut(&entity.id) {
            Some(existing) => {
                existing.absorb(entity);
                Ok(UpsertOutcome::Merged)
            }
            None => {
                state.entities.insert(entity.id.clone(), entity.clone());
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn upsert_relationship(&self, relationship: &Relationship) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.lock();
        for (role, endpoint) in [("source", &relationship.source_id), ("target", &relationship.target_id)] {
            if !state.entities.contains_key(endpoint) {
                return Err(StoreError::MissingEndpoint {
                    relationship_id: relationship.id.clone(),
                    role,
                    endpoint_id: endpoint.clone(),
                });
            }
        }

        let key = relationship.edge_key();
        let existing_id = if state.relationships.contains_key(&relationship.id) {
            Some(relationship.id.clone())
        } else {
            state.edge_index.get(&key).cloned()
        };
        if let Some(id) = existing_id {
            if let Some(existing) = state.relationships.get_mut(&id) {
                existing.absorb(relationship);
                return Ok(UpsertOutcome::Merged);
            }
        }

        state.edge_index.insert(key, relationship.id.clone());
        state
            .relationships
            .insert(relationship.id.clone(), relationship.clone());
        Ok(UpsertOutcome::Created)
    }

    async fn query(&self, query: &CanonicalQuery) -> Result<Vec<QueryRow>, StoreError> {
        let state = self.lock();
        match query {
            CanonicalQuery::AllEntities => state.entity_rows(state.entities.values()),
            CanonicalQuery::EntitiesOfType { entity_type } => {
                state.entity_rows(state.entities.values().filter(|e| e.entity_type == *entity_type))
            }
            CanonicalQuery::AllRelationships => state.all_relationships(),
            CanonicalQuery::EntityTypeHistogram => {
                let mut counts = BTreeMap::new();
                for e in state.entities.values() {
                    *counts.entry(e.entity_type.as_str()).or_insert(0) += 1;
                }
                Ok(GraphState::histogram(counts))
            }
            CanonicalQuery::RelationshipTypeHistogram => {
                let mut counts = BTreeMap::new();
                for r in state.relationships.values() {
                    *counts.entry(r.rel_type.as_str()).or_insert(0) += 1;
                }
                Ok(GraphState::histogram(counts))
            }
            CanonicalQuery::Neighbors { entity_id } => state.neighbors(entity_id),
            CanonicalQuery::ShortestPath { from_label, to_label } => state.shortest_paths(from_label, to_label),
            CanonicalQuery::TopByDegree { limit } => state.top_by_degree(*limit),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        *state = GraphState::default();
        tracing::info!("in-memory graph cleared");
        Ok(())
    }
}
