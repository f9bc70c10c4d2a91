mod common;

use code_knowledge_graph::core::merge::merge;
use code_knowledge_graph::core::records::Relationship;
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use code_knowledge_graph::store::StoreError;
use code_knowledge_graph::store::memory::InMemoryStore;
use common::{Call, ScriptedStore, entity, sample_batch};

#[tokio::test]
async fn fresh_merge_counts_creations() {
    let store = InMemoryStore::new();
    let report = merge(&store, &sample_batch()).await.unwrap();
    assert_eq!(report.entities_created, 4);
    assert_eq!(report.relationships_created, 4);
    assert_eq!(report.entities_written(), 4);
    assert_eq!(report.relationships_written(), 4);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn dangling_relationships_are_counted_and_skipped() {
    let store = InMemoryStore::new();
    let mut batch = sample_batch();
    let ghost = entity("Ghost", EntityType::Function, "pkg/svc.go", 40);
    let dangling = Relationship::between(&batch.entities[2], &ghost, RelationshipType::Calls);
    batch.relationships.insert(0, dangling.clone());

    let report = merge(&store, &batch).await.unwrap();
    assert_eq!(report.relationships_failed, 1);
    assert_eq!(report.relationships_created, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_id, dangling.id);
    assert_eq!(report.failures[0].kind, "relationship");
    assert!(report.failures[0].reason.contains(&ghost.id));
    assert_eq!(store.relationship_count(), 4);
}

#[tokio::test]
async fn entities_are_written_before_relationships() {
    let store = ScriptedStore::default();
    let batch = sample_batch();
    let report = merge(&store, &batch).await.unwrap();

    let calls = store.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 8);
    assert!(calls[..4].iter().all(|c| matches!(c, Call::Entity(_))));
    assert!(calls[4..].iter().all(|c| matches!(c, Call::Relationship(_))));

    // the scripted store times out every relationship
    assert_eq!(report.entities_created, 4);
    assert_eq!(report.relationships_failed, 4);
}

#[tokio::test]
async fn connectivity_failures_abort_the_merge() {
    let store = ScriptedStore {
        fail_relationships_with_connection_error: true,
        ..Default::default()
    };
    let err = merge(&store, &sample_batch()).await.unwrap_err();
    assert!(matches!(err, StoreError::Connection(_)));
    assert!(!err.is_record_level());
    // stopped at the first relationship
    assert_eq!(store.calls.lock().unwrap().len(), 5);
}
