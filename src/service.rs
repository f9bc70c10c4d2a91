use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::merge::{MergeReport, merge};
use crate::core::orchestrator::{ExtractSource, ExtractionReport, Extractor};
use crate::core::records::{Entity, GraphBatch, Relationship};
use crate::core::types::EntityType;
use crate::store::query::CanonicalQuery;
use crate::store::{DynStore, QueryRow};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub total_entities: u64,
    pub total_relationships: u64,
    pub entities_by_type: BTreeMap<String, u64>,
    pub relationships_by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub directories_pruned: usize,
    pub entities: usize,
    pub relationships: usize,
    pub merge: MergeReport,
}

/// Extraction plus persistence plus the read-side query repertoire, over one store.
#[derive(Clone)]
pub struct KnowledgeGraphService {
    extractor: Arc<Extractor>,
    store: DynStore,
}

fn histogram(rows: &[QueryRow]) -> BTreeMap<String, u64> {
    rows.iter()
        .filter_map(|r| {
            let t = r.get("type")?.as_str()?.to_string();
            let c = r.get("count")?.as_u64()?;
            Some((t, c))
        })
        .collect()
}

impl KnowledgeGraphService {
    pub fn new(extractor: Arc<Extractor>, store: DynStore) -> Self {
        Self { extractor, store }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Run the extractor on a blocking thread.
    pub async fn extract(&self, source: ExtractSource) -> anyhow::Result<ExtractionReport> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract(&source))
            .await
            .context("extraction task panicked")?
    }

    /// Text is analyzed only; the text processor's output is never persisted.
    pub async fn analyze_text(&self, text: String) -> anyhow::Result<ExtractionReport> {
        self.extract(ExtractSource::Text(text)).await
    }

    pub async fn extract_and_store(&self, source: ExtractSource) -> anyhow::Result<IngestSummary> {
        let report = self.extract(source).await?;
        let merge_report = self.store_batch(&report.batch).await?;
        Ok(IngestSummary {
            files_analyzed: report.files_analyzed,
            files_skipped: report.files_skipped,
            directories_pruned: report.directories_pruned,
            entities: report.batch.entities.len(),
            relationships: report.batch.relationships.len(),
            merge: merge_report,
        })
    }

    pub async fn store_batch(&self, batch: &GraphBatch) -> anyhow::Result<MergeReport> {
        merge(self.store.as_ref(), batch)
            .await
            .with_context(|| format!("merge into {} store failed", self.store.backend_name()))
    }

    pub async fn query(&self, query: &CanonicalQuery) -> anyhow::Result<Vec<QueryRow>> {
        self.store
            .query(query)
            .await
            .with_context(|| format!("query {:?} failed", query))
    }

    /// Textual entry point. Text that is not one of the canonical shapes
    /// returns no rows.
    pub async fn query_cypher(&self, cypher: &str, params: &Map<String, Value>) -> anyhow::Result<Vec<QueryRow>> {
        match CanonicalQuery::from_cypher(cypher, params) {
            Some(q) => self.query(&q).await,
            None => {
                tracing::warn!(cypher = %cypher.trim(), "unrecognized query text; returning no rows");
                Ok(Vec::new())
            }
        }
    }

    pub async fn statistics(&self) -> anyhow::Result<GraphStatistics> {
        let entities_by_type = histogram(&self.query(&CanonicalQuery::EntityTypeHistogram).await?);
        let relationships_by_type = histogram(&self.query(&CanonicalQuery::RelationshipTypeHistogram).await?);
        Ok(GraphStatistics {
            total_entities: entities_by_type.values().sum(),
            total_relationships: relationships_by_type.values().sum(),
            entities_by_type,
            relationships_by_type,
        })
    }

    /// The whole stored graph as a batch.
    pub async fn export(&self) -> anyhow::Result<GraphBatch> {
        let mut batch = GraphBatch::new();
        for row in self.query(&CanonicalQuery::AllEntities).await? {
            if let Some(n) = row.get("n") {
                let e: Entity = serde_json::from_value(n.clone()).context("decode exported entity")?;
                batch.entities.push(e);
            }
        }
        for row in self.query(&CanonicalQuery::AllRelationships).await? {
            if let Some(r) = row.get("r") {
                let r: Relationship = serde_json::from_value(r.clone()).context("decode exported relationship")?;
                batch.relationships.push(r);
            }
        }
        Ok(batch)
    }

    pub async fn entities(&self, entity_type: Option<EntityType>) -> anyhow::Result<Vec<QueryRow>> {
        let q = match entity_type {
            Some(entity_type) => CanonicalQuery::EntitiesOfType { entity_type },
            None => CanonicalQuery::AllEntities,
        };
        self.query(&q).await
    }

    pub async fn relationships(&self) -> anyhow::Result<Vec<QueryRow>> {
        self.query(&CanonicalQuery::AllRelationships).await
    }

    pub async fn neighbors(&self, entity_id: &str) -> anyhow::Result<Vec<QueryRow>> {
        self.query(&CanonicalQuery::Neighbors {
            entity_id: entity_id.to_string(),
        })
        .await
    }

    pub async fn find_path(&self, from_label: &str, to_label: &str) -> anyhow::Result<Vec<QueryRow>> {
        self.query(&CanonicalQuery::ShortestPath {
            from_label: from_label.to_string(),
            to_label: to_label.to_string(),
        })
        .await
    }

    pub async fn influential(&self, limit: usize) -> anyhow::Result<Vec<QueryRow>> {
        self.query(&CanonicalQuery::TopByDegree { limit }).await
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.store.clear().await.context("clear store")
    }
}
