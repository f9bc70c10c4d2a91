pub mod memgraph;
pub mod memory;
pub mod query;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::records::{Entity, Relationship};
use crate::store::query::CanonicalQuery;

pub type QueryRow = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("relationship {relationship_id}: {role} entity {endpoint_id} does not exist")]
    MissingEndpoint {
        relationship_id: String,
        role: &'static str,
        endpoint_id: String,
    },
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store is not connected")]
    NotConnected,
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl StoreError {
    /// Failures confined to one record; a batch merge counts them and moves on.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            StoreError::MissingEndpoint { .. } | StoreError::Timeout(_) | StoreError::InvalidRecord { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Merged,
}

/// Persistence seam for extracted graphs.
///
/// Upserts follow one merge rule: label overwritten, confidence only grows,
/// properties merged key by key with the incoming value winning.
#[async_trait]
pub trait GraphStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn connect(&self) -> Result<(), StoreError>;

    async fn disconnect(&self) -> Result<(), StoreError>;

    async fn upsert_entity(&self, entity: &Entity) -> Result<UpsertOutcome, StoreError>;

    /// Both endpoints must already exist, otherwise nothing is written.
    /// An edge with the same (source, type, target) is the same logical edge.
    async fn upsert_relationship(&self, relationship: &Relationship) -> Result<UpsertOutcome, StoreError>;

    async fn query(&self, query: &CanonicalQuery) -> Result<Vec<QueryRow>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

pub type DynStore = Arc<dyn GraphStore>;
