use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::core::stable_ids::{entity_id, relationship_id};
use crate::core::types::{EntityType, RelationshipType};

pub type Properties = Map<String, Value>;

pub const DEFAULT_CONFIDENCE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub properties: Properties,
    pub confidence: f64,
}

impl Entity {
    pub fn new(label: impl Into<String>, entity_type: EntityType, properties: Properties) -> Self {
        let label = label.into();
        let id = entity_id(&label, entity_type, &properties);
        Self {
            id,
            label,
            entity_type,
            properties,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Merge an incoming observation of the same entity into this one.
    ///
    /// Label is overwritten, confidence only grows, and properties are merged
    /// key by key with the incoming value winning.
    pub fn absorb(&mut self, incoming: &Entity) {
        self.label = incoming.label.clone();
        self.confidence = self.confidence.max(incoming.confidence);
        for (k, v) in &incoming.properties {
            self.properties.insert(k.clone(), v.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,
    #[serde(default)]
    pub properties: Properties,
    pub confidence: f64,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        rel_type: RelationshipType,
        properties: Properties,
    ) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        let id = relationship_id(&source_id, rel_type, &target_id);
        Self {
            id,
            source_id,
            target_id,
            rel_type,
            properties,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn between(source: &Entity, target: &Entity, rel_type: RelationshipType) -> Self {
        Self::new(source.id.clone(), target.id.clone(), rel_type, Properties::new())
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// The (source, type, target) triple that identifies the logical edge.
    pub fn edge_key(&self) -> (String, RelationshipType, String) {
        (self.source_id.clone(), self.rel_type, self.target_id.clone())
    }

    pub fn absorb(&mut self, incoming: &Relationship) {
        self.confidence = self.confidence.max(incoming.confidence);
        for (k, v) in &incoming.properties {
            self.properties.insert(k.clone(), v.clone());
        }
    }
}

/// A file read from disk, alive only for the duration of one extraction.
#[derive(Debug, Clone)]
pub struct CodeFile {
    pub path: String,
    pub name: String,
    pub extension: String,
    pub content: String,
    pub language: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl CodeFile {
    /// Build a file record from in-memory content (no disk access).
    pub fn from_content(path: impl Into<String>, language: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let extension = match name.rfind('.') {
            Some(i) if i > 0 => name[i..].to_ascii_lowercase(),
            _ => String::new(),
        };
        Self {
            size: content.len() as u64,
            path,
            name,
            extension,
            content,
            language: language.into(),
            last_modified: None,
        }
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    pub fn file_entity(&self) -> Entity {
        let mut props = Properties::new();
        props.insert("path".to_string(), Value::String(self.path.clone()));
        props.insert("extension".to_string(), Value::String(self.extension.clone()));
        props.insert("language".to_string(), Value::String(self.language.clone()));
        props.insert("size".to_string(), Value::from(self.size));
        if let Some(ts) = self.last_modified {
            props.insert("lastModified".to_string(), Value::String(ts.to_rfc3339()));
        }
        props.insert("lineCount".to_string(), Value::from(self.line_count() as u64));
        Entity::new(self.name.clone(), EntityType::File, props)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphBatch {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }

    pub fn extend(&mut self, other: GraphBatch) {
        self.entities.extend(other.entities);
        self.relationships.extend(other.relationships);
    }

    /// Collapse repeated observations in place, keeping first-seen order.
    ///
    /// Entities sharing an id and relationships sharing an id or a
    /// (source, type, target) triple are merged with the store's merge rule.
    pub fn coalesce(&mut self) {
        let mut entity_pos: HashMap<String, usize> = HashMap::new();
        let mut entities: Vec<Entity> = Vec::with_capacity(self.entities.len());
        for e in self.entities.drain(..) {
            match entity_pos.get(&e.id) {
                Some(&i) => entities[i].absorb(&e),
                None => {
                    entity_pos.insert(e.id.clone(), entities.len());
                    entities.push(e);
                }
            }
        }
        self.entities = entities;

        let mut rel_pos: HashMap<String, usize> = HashMap::new();
        let mut key_pos: HashMap<(String, RelationshipType, String), usize> = HashMap::new();
        let mut relationships: Vec<Relationship> = Vec::with_capacity(self.relationships.len());
        for r in self.relationships.drain(..) {
            let existing = rel_pos
                .get(&r.id)
                .or_else(|| key_pos.get(&r.edge_key()))
                .copied();
            match existing {
                Some(i) => relationships[i].absorb(&r),
                None => {
                    rel_pos.insert(r.id.clone(), relationships.len());
                    key_pos.insert(r.edge_key(), relationships.len());
                    relationships.push(r);
                }
            }
        }
        self.relationships = relationships;
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entities_of_type(&self, t: EntityType) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.entity_type == t)
    }

    pub fn relationships_of_type(&self, t: RelationshipType) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter().filter(move |r| r.rel_type == t)
    }

    pub fn entity_type_counts(&self) -> BTreeMap<EntityType, usize> {
        let mut out = BTreeMap::new();
        for e in &self.entities {
            *out.entry(e.entity_type).or_insert(0) += 1;
        }
        out
    }

    pub fn relationship_type_counts(&self) -> BTreeMap<RelationshipType, usize> {
        let mut out = BTreeMap::new();
        for r in &self.relationships {
            *out.entry(r.rel_type).or_insert(0) += 1;
        }
        out
    }
}
