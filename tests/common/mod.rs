#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use code_knowledge_graph::core::records::{Entity, GraphBatch, Properties, Relationship};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use code_knowledge_graph::store::query::CanonicalQuery;
use code_knowledge_graph::store::{GraphStore, QueryRow, StoreError, UpsertOutcome};

pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let abs = root.join(rel);
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(abs, contents).unwrap();
}

pub fn props(v: Value) -> Properties {
    v.as_object().cloned().unwrap_or_default()
}

pub fn entity(label: &str, t: EntityType, file: &str, line: u64) -> Entity {
    Entity::new(label, t, props(json!({ "sourceFile": file, "lineNumber": line })))
}

/// file → class → two methods, one calling the other.
pub fn sample_batch() -> GraphBatch {
    let file = Entity::new("svc.go", EntityType::File, props(json!({ "path": "pkg/svc.go" })));
    let class = entity("Service", EntityType::Class, "pkg/svc.go", 3);
    let start = entity("Start", EntityType::Method, "pkg/svc.go", 7);
    let stop = entity("Stop", EntityType::Method, "pkg/svc.go", 12);
    let relationships = vec![
        Relationship::between(&file, &class, RelationshipType::Defines),
        Relationship::between(&class, &start, RelationshipType::Contains),
        Relationship::between(&class, &stop, RelationshipType::Contains),
        Relationship::between(&start, &stop, RelationshipType::Calls),
    ];
    GraphBatch {
        entities: vec![file, class, start, stop],
        relationships,
    }
}

pub fn find<'a>(batch: &'a GraphBatch, t: EntityType, label: &str) -> &'a Entity {
    batch
        .entities
        .iter()
        .find(|e| e.entity_type == t && e.label == label)
        .unwrap_or_else(|| panic!("no {t} entity labeled {label}"))
}

pub fn has_edge(batch: &GraphBatch, from: &Entity, t: RelationshipType, to: &Entity) -> bool {
    batch
        .relationships
        .iter()
        .any(|r| r.source_id == from.id && r.rel_type == t && r.target_id == to.id)
}

pub fn labels_of(batch: &GraphBatch, t: EntityType) -> Vec<String> {
    batch.entities_of_type(t).map(|e| e.label.clone()).collect()
}

#[derive(Debug, Clone)]
pub enum Call {
    Entity(String),
    Relationship(String),
}

/// Store that accepts entities and fails relationships with a fixed error.
#[derive(Default)]
pub struct ScriptedStore {
    pub calls: Mutex<Vec<Call>>,
    pub fail_relationships_with_connection_error: bool,
}

#[async_trait]
impl GraphStore for ScriptedStore {
    fn backend_name(&self) -> &'static str {
        "scripted"
    }

    async fn connect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<UpsertOutcome, StoreError> {
        self.calls.lock().unwrap().push(Call::Entity(entity.id.clone()));
        Ok(UpsertOutcome::Created)
    }

    async fn upsert_relationship(&self, relationship: &Relationship) -> Result<UpsertOutcome, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Relationship(relationship.id.clone()));
        if self.fail_relationships_with_connection_error {
            return Err(StoreError::Connection("connection reset".to_string()));
        }
        Err(StoreError::Timeout(std::time::Duration::from_millis(5)))
    }

    async fn query(&self, _query: &CanonicalQuery) -> Result<Vec<QueryRow>, StoreError> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// 1-based number of the first line of `content` containing `needle`.
pub fn line_of(content: &str, needle: &str) -> u64 {
    content
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i as u64 + 1)
        .unwrap_or_else(|| panic!("{needle:?} not found"))
}

pub fn line_prop(e: &Entity) -> Option<u64> {
    e.properties.get("lineNumber").and_then(Value::as_u64)
}
