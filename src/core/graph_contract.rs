use std::collections::HashSet;

use crate::core::records::GraphBatch;
use crate::core::stable_ids::{entity_id, relationship_id};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GraphContractViolation {
    pub message: String,
}

fn violation(message: String) -> GraphContractViolation {
    GraphContractViolation { message }
}

/// Check the invariants every batch handed to a store must satisfy.
///
/// Expects a coalesced batch: entity and relationship ids are unique.
pub fn validate_graph_contract(batch: &GraphBatch) -> Result<(), GraphContractViolation> {
    let mut entity_ids: HashSet<&str> = HashSet::with_capacity(batch.entities.len());
    for e in &batch.entities {
        if e.id.is_empty() {
            return Err(violation(format!("Entity id is empty: {}", e.label)));
        }
        if !entity_ids.insert(e.id.as_str()) {
            return Err(violation(format!("Duplicate entity id detected: {}", e.id)));
        }
        if !(0.0..=1.0).contains(&e.confidence) {
            return Err(violation(format!("Entity confidence out of range: {}", e.id)));
        }
        let expected = entity_id(&e.label, e.entity_type, &e.properties);
        if e.id != expected {
            return Err(violation(format!(
                "Entity id does not match its identity properties: {} ({} {})",
                e.id, e.entity_type, e.label
            )));
        }
    }

    let mut rel_ids: HashSet<&str> = HashSet::with_capacity(batch.relationships.len());
    for r in &batch.relationships {
        if r.source_id.trim().is_empty() || r.target_id.trim().is_empty() {
            return Err(violation(format!("Relationship endpoint is empty: {}", r.id)));
        }
        if !rel_ids.insert(r.id.as_str()) {
            return Err(violation(format!("Duplicate relationship id detected: {}", r.id)));
        }
        if r.id != relationship_id(&r.source_id, r.rel_type, &r.target_id) {
            return Err(violation(format!(
                "Relationship id does not match its endpoints: {}",
                r.id
            )));
        }
        if !(0.0..=1.0).contains(&r.confidence) {
            return Err(violation(format!("Relationship confidence out of range: {}", r.id)));
        }
        if !entity_ids.contains(r.source_id.as_str()) {
            return Err(violation(format!(
                "{} source not found in batch: {}",
                r.rel_type, r.source_id
            )));
        }
        if !entity_ids.contains(r.target_id.as_str()) {
            return Err(violation(format!(
                "{} target not found in batch: {}",
                r.rel_type, r.target_id
            )));
        }
    }

    Ok(())
}
