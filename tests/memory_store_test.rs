mod common;

use code_knowledge_graph::core::merge::merge;
use code_knowledge_graph::core::records::{Entity, GraphBatch, Relationship};
use code_knowledge_graph::core::types::{EntityType, RelationshipType};
use code_knowledge_graph::store::memory::InMemoryStore;
use code_knowledge_graph::store::query::CanonicalQuery;
use code_knowledge_graph::store::{GraphStore, StoreError, UpsertOutcome};
use common::{entity, props, sample_batch};
use serde_json::{Value, json};

async fn loaded() -> (InMemoryStore, GraphBatch) {
    let store = InMemoryStore::new();
    let batch = sample_batch();
    merge(&store, &batch).await.unwrap();
    (store, batch)
}

fn ids_in(rows: &[serde_json::Map<String, Value>], field: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.get(field)?.get("id")?.as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn merging_the_same_batch_twice_is_idempotent() {
    let (store, batch) = loaded().await;
    let before = (store.entity_count(), store.relationship_count());

    let report = merge(&store, &batch).await.unwrap();
    assert_eq!(report.entities_created, 0);
    assert_eq!(report.entities_merged, batch.entities.len());
    assert_eq!(report.relationships_created, 0);
    assert_eq!(report.relationships_merged, batch.relationships.len());
    assert_eq!((store.entity_count(), store.relationship_count()), before);
    assert_eq!(before, (4, 4));
}

#[tokio::test]
async fn relationships_require_both_endpoints() {
    let store = InMemoryStore::new();
    let a = entity("a", EntityType::Function, "x.go", 1);
    let b = entity("b", EntityType::Function, "x.go", 5);
    store.upsert_entity(&a).await.unwrap();

    let err = store
        .upsert_relationship(&Relationship::between(&a, &b, RelationshipType::Calls))
        .await
        .unwrap_err();
    match err {
        StoreError::MissingEndpoint { role, endpoint_id, .. } => {
            assert_eq!(role, "target");
            assert_eq!(endpoint_id, b.id);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = store
        .upsert_relationship(&Relationship::between(&b, &a, RelationshipType::Calls))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingEndpoint { role: "source", .. }));
    assert!(err.is_record_level());
    assert_eq!(store.relationship_count(), 0);
}

#[tokio::test]
async fn entity_merge_keeps_max_confidence_and_overlays_properties() {
    let store = InMemoryStore::new();
    let first = Entity::new("Config", EntityType::Class, props(json!({ "sourceFile": "c.py", "lineNumber": 2, "a": 1, "b": 1 })))
        .with_confidence(0.9);
    let second = Entity::new("CONFIG", EntityType::Class, props(json!({ "sourceFile": "c.py", "lineNumber": 2, "b": 2, "c": 3 })))
        .with_confidence(0.4);
    assert_eq!(first.id, second.id);

    assert_eq!(store.upsert_entity(&first).await.unwrap(), UpsertOutcome::Created);
    assert_eq!(store.upsert_entity(&second).await.unwrap(), UpsertOutcome::Merged);

    let stored = store.entity(&first.id).unwrap();
    assert_eq!(stored.label, "CONFIG");
    assert_eq!(stored.confidence, 0.9);
    assert_eq!(stored.properties["a"], json!(1));
    assert_eq!(stored.properties["b"], json!(2));
    assert_eq!(stored.properties["c"], json!(3));

    let third = second.clone().with_confidence(1.0);
    store.upsert_entity(&third).await.unwrap();
    assert_eq!(store.entity(&first.id).unwrap().confidence, 1.0);
}

#[tokio::test]
async fn relationships_dedup_on_endpoints_and_type() {
    let (store, batch) = loaded().await;
    let start = &batch.entities[2];
    let stop = &batch.entities[3];

    let mut alias = Relationship::between(start, stop, RelationshipType::Calls)
        .with_property("lineNumber", 9)
        .with_confidence(0.5);
    alias.id = "legacy-edge-id".to_string();
    assert_eq!(store.upsert_relationship(&alias).await.unwrap(), UpsertOutcome::Merged);
    assert_eq!(store.relationship_count(), 4);

    let canonical = Relationship::between(start, stop, RelationshipType::Calls);
    let stored = store.relationship(&canonical.id).unwrap();
    assert_eq!(stored.confidence, 1.0);
    assert_eq!(stored.properties["lineNumber"], json!(9));
}

#[tokio::test]
async fn histograms_sum_to_totals() {
    let (store, _) = loaded().await;
    let rows = store.query(&CanonicalQuery::EntityTypeHistogram).await.unwrap();
    let total: u64 = rows.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(total as usize, store.entity_count());
    let types: Vec<&str> = rows.iter().map(|r| r["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["CLASS", "FILE", "METHOD"]);

    let rows = store.query(&CanonicalQuery::RelationshipTypeHistogram).await.unwrap();
    let total: u64 = rows.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(total as usize, store.relationship_count());
}

#[tokio::test]
async fn relationship_rows_reference_stored_entities() {
    let (store, _) = loaded().await;
    let entity_ids = ids_in(&store.query(&CanonicalQuery::AllEntities).await.unwrap(), "n");
    assert_eq!(entity_ids.len(), 4);

    let rows = store.query(&CanonicalQuery::AllRelationships).await.unwrap();
    assert_eq!(rows.len(), 4);
    for row in &rows {
        let r: Relationship = serde_json::from_value(row["r"].clone()).unwrap();
        assert!(entity_ids.contains(&r.source_id));
        assert!(entity_ids.contains(&r.target_id));
        assert_eq!(row["a"]["id"], json!(r.source_id));
        assert_eq!(row["b"]["id"], json!(r.target_id));
    }
}

#[tokio::test]
async fn entities_of_type_filters() {
    let (store, _) = loaded().await;
    let rows = store
        .query(&CanonicalQuery::EntitiesOfType {
            entity_type: EntityType::Method,
        })
        .await
        .unwrap();
    let mut labels: Vec<&str> = rows.iter().map(|r| r["n"]["label"].as_str().unwrap()).collect();
    labels.sort();
    assert_eq!(labels, vec!["Start", "Stop"]);
    assert_eq!(rows[0]["n"]["type"], json!("METHOD"));
}

#[tokio::test]
async fn neighbors_report_direction() {
    let (store, batch) = loaded().await;
    let start = &batch.entities[2];
    let rows = store
        .query(&CanonicalQuery::Neighbors {
            entity_id: start.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);

    let mut seen: Vec<(String, String)> = rows
        .iter()
        .map(|r| {
            (
                r["connected"]["label"].as_str().unwrap().to_string(),
                r["direction"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("Service".to_string(), "incoming".to_string()),
            ("Stop".to_string(), "outgoing".to_string()),
        ]
    );

    let none = store
        .query(&CanonicalQuery::Neighbors {
            entity_id: "missing".to_string(),
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn shortest_path_ignores_direction() {
    let (store, _) = loaded().await;
    let rows = store
        .query(&CanonicalQuery::ShortestPath {
            from_label: "Stop".to_string(),
            to_label: "svc.go".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["pathLength"], json!(2));
    let labels: Vec<&str> = rows[0]["path"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["Stop", "Service", "svc.go"]);
    assert_eq!(rows[0]["relationships"].as_array().unwrap().len(), 2);

    let unknown = store
        .query(&CanonicalQuery::ShortestPath {
            from_label: "Stop".to_string(),
            to_label: "Nowhere".to_string(),
        })
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn shortest_path_without_connection_is_empty() {
    let (store, _) = loaded().await;
    let island = entity("Island", EntityType::Class, "other.go", 1);
    store.upsert_entity(&island).await.unwrap();
    let rows = store
        .query(&CanonicalQuery::ShortestPath {
            from_label: "Island".to_string(),
            to_label: "Stop".to_string(),
        })
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn top_by_degree_orders_by_connection_count() {
    let (store, _) = loaded().await;
    let rows = store.query(&CanonicalQuery::TopByDegree { limit: 2 }).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["n"]["label"], json!("Service"));
    assert_eq!(rows[0]["connections"], json!(3));
    assert_eq!(rows[1]["connections"], json!(2));
}

#[tokio::test]
async fn clear_empties_the_graph() {
    let (store, _) = loaded().await;
    store.clear().await.unwrap();
    assert_eq!(store.entity_count(), 0);
    assert_eq!(store.relationship_count(), 0);
    assert!(store.query(&CanonicalQuery::AllEntities).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_keep_one_record_and_max_confidence() {
    let store = std::sync::Arc::new(InMemoryStore::new());
    let labels = ["Alpha", "Beta", "Gamma"];

    let mut tasks = Vec::new();
    for n in 0..16u32 {
        let store = std::sync::Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            let confidence = f64::from(n + 1) / 20.0;
            for (line, label) in labels.iter().enumerate() {
                let e = entity(label, EntityType::Class, "pkg/shared.go", line as u64 + 1).with_confidence(confidence);
                store.upsert_entity(&e).await.unwrap();
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    assert_eq!(store.entity_count(), labels.len());
    for (line, label) in labels.iter().enumerate() {
        let id = entity(label, EntityType::Class, "pkg/shared.go", line as u64 + 1).id;
        let stored = store.entity(&id).unwrap();
        assert_eq!(stored.confidence, 16.0 / 20.0);
    }
}
