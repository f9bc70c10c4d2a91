use crate::core::records::Properties;
use crate::core::types::{EntityType, RelationshipType};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest (128 bits).
pub const ID_HEX_LEN: usize = 32;

pub fn stable_id<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    stable_id_with_size(parts, ID_HEX_LEN)
}

pub fn stable_id_with_size<I, S>(parts: I, size: usize) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let raw = parts
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("|");

    let mut h = Sha256::new();
    h.update(raw.as_bytes());
    let digest = h.finalize();
    hex::encode(digest)[..size].to_string()
}

/// String form of a property value as it participates in identity.
pub fn canonical_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // serde_json maps are key-ordered, so this is stable.
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Ordered identity parts for an entity. Exposed so callers can debug collisions.
pub fn entity_key_parts(label: &str, entity_type: EntityType, properties: &Properties) -> Vec<String> {
    let mut parts = vec![
        entity_type.as_str().to_lowercase(),
        label.to_lowercase(),
    ];

    if let Some(v) = ["fullPath", "path", "relativePath"]
        .iter()
        .find_map(|k| properties.get(*k))
    {
        parts.push(canonical_value(v).to_lowercase());
    }

    if let Some(source_file) = properties.get("sourceFile") {
        parts.push(canonical_value(source_file).to_lowercase());
        if let Some(line) = properties.get("lineNumber") {
            parts.push(format!("line:{}", canonical_value(line)));
        }
    }

    if let Some(ns) = properties.get("namespace") {
        parts.push(format!("ns:{}", canonical_value(ns)).to_lowercase());
    }
    if let Some(pkg) = properties.get("package") {
        parts.push(format!("pkg:{}", canonical_value(pkg)).to_lowercase());
    }

    parts
}

pub fn entity_id(label: &str, entity_type: EntityType, properties: &Properties) -> String {
    stable_id(entity_key_parts(label, entity_type, properties))
}

pub fn relationship_id(source_id: &str, rel_type: RelationshipType, target_id: &str) -> String {
    stable_id([source_id, rel_type.as_str(), target_id])
}
