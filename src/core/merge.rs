use serde::Serialize;

use crate::core::records::GraphBatch;
use crate::store::{GraphStore, StoreError, UpsertOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeFailure {
    pub record_id: String,
    pub kind: &'static str,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub entities_created: usize,
    pub entities_merged: usize,
    pub entities_failed: usize,
    pub relationships_created: usize,
    pub relationships_merged: usize,
    pub relationships_failed: usize,
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn entities_written(&self) -> usize {
        self.entities_created + self.entities_merged
    }

    pub fn relationships_written(&self) -> usize {
        self.relationships_created + self.relationships_merged
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Upsert every entity, then every relationship, into `store`.
///
/// Record-level failures (missing endpoint, timeout, invalid record) are
/// counted and the batch continues; connectivity failures abort the merge.
pub async fn merge(store: &dyn GraphStore, batch: &GraphBatch) -> Result<MergeReport, StoreError> {
    let mut report = MergeReport::default();

    for entity in &batch.entities {
        match store.upsert_entity(entity).await {
            Ok(UpsertOutcome::Created) => report.entities_created += 1,
            Ok(UpsertOutcome::Merged) => report.entities_merged += 1,
            Err(err) if err.is_record_level() => {
                tracing::warn!(entity_id = %entity.id, label = %entity.label, error = %err, "entity not stored");
                report.entities_failed += 1;
                report.failures.push(MergeFailure {
                    record_id: entity.id.clone(),
                    kind: "entity",
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    for rel in &batch.relationships {
        match store.upsert_relationship(rel).await {
            Ok(UpsertOutcome::Created) => report.relationships_created += 1,
            Ok(UpsertOutcome::Merged) => report.relationships_merged += 1,
            Err(err) if err.is_record_level() => {
                tracing::warn!(relationship_id = %rel.id, rel_type = %rel.rel_type, error = %err, "relationship not stored");
                report.relationships_failed += 1;
                report.failures.push(MergeFailure {
                    record_id: rel.id.clone(),
                    kind: "relationship",
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    tracing::info!(
        backend = store.backend_name(),
        entities_created = report.entities_created,
        entities_merged = report.entities_merged,
        relationships_created = report.relationships_created,
        relationships_merged = report.relationships_merged,
        failed = report.failures.len(),
        "merge complete"
    );
    Ok(report)
}
