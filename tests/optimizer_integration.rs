//! Integration tests for pipeline reordering and index advice.
//!
//! These tests drive the optimizer through the builder with in-memory
//! index inspectors.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use aggkit::prelude::*;
use aggkit::{INDEX_CANDIDATE_KINDS, InspectError, InspectResult};
use async_trait::async_trait;
use pretty_assertions::assert_eq;

/// An inspector that knows only `_id` and counts every call.
#[derive(Clone, Default)]
struct CountingInspector {
    lookups: Arc<AtomicUsize>,
    creations: Arc<AtomicUsize>,
}

#[async_trait]
impl IndexInspector for CountingInspector {
    async fn indexed_fields(&self, collection: &str) -> InspectResult<HashSet<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if collection == "missing" {
            return Err(InspectError::collection_not_found(collection));
        }
        Ok(HashSet::from(["_id".to_string()]))
    }

    async fn create_index(&self, _collection: &str, field: &str) -> InspectResult<String> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        if field == "bad" {
            return Err(InspectError::command("cannot index field"));
        }
        Ok(format!("idx_{}", field))
    }
}

/// Test the documented stable reordering example
#[test]
fn test_reordering_stability() {
    let pipeline = vec![
        Stage::Match(doc! { "a": 1 }),
        Stage::Project(doc! { "x": 1 }),
        Stage::Match(doc! { "b": 1 }),
        Stage::Sort(doc! { "c": 1 }),
        Stage::Skip(3),
        Stage::Sort(doc! { "d": 1 }),
    ];

    let kinds: Vec<StageKind> = Optimizer::optimize_pipeline(&pipeline)
        .iter()
        .map(Stage::kind)
        .collect();

    assert_eq!(
        kinds,
        vec![
            StageKind::Match,
            StageKind::Match,
            StageKind::Sort,
            StageKind::Sort,
            StageKind::Project,
            StageKind::Skip,
        ]
    );
}

/// Test idempotence and permutation over a mixed pipeline
#[test]
fn test_reordering_idempotence() {
    let pipeline = vec![
        Stage::Sample(10),
        Stage::Sort(doc! { "b": 1 }),
        Stage::Group {
            group_by: Bson::Null,
            accumulators: doc! { "n": { "$sum": 1 } },
        },
        Stage::Match(doc! { "a": 1 }),
        Stage::Sort(doc! { "a": -1 }),
        Stage::Out("result".into()),
    ];

    let once = Optimizer::optimize_pipeline(&pipeline);
    assert_eq!(Optimizer::optimize_pipeline(&once), once);

    assert_eq!(once.len(), pipeline.len());
    for stage in &pipeline {
        assert!(once.contains(stage));
    }
}

/// Test the documented recommendation example
#[tokio::test]
async fn test_recommendation() {
    let optimizer = Optimizer::new(StaticInspector::new().with_indexes("users", ["isActive"]));

    let missing = optimizer
        .analyze_and_recommend_indexes("users", &["isActive".to_string(), "createdAt".to_string()])
        .await
        .unwrap();

    assert_eq!(missing, vec!["createdAt".to_string()]);
}

/// Test that optimize reorders, inspects each collection once and logs in order
#[tokio::test]
async fn test_optimize_across_collections() {
    let inspector = CountingInspector::default();

    let builder = PipelineBuilder::new()
        .debug(true)
        .optimizer(Optimizer::new(inspector.clone()))
        .collections(["users", "missing", "orders"])
        .project(doc! { "name": 1 })
        .sort(doc! { "name": 1 })
        .match_stage(doc! { "isActive": true })
        .optimize()
        .await;

    assert_eq!(inspector.lookups.load(Ordering::SeqCst), 3);
    assert_eq!(builder.stages()[0].kind(), StageKind::Match);
    assert_eq!(builder.stages()[2].kind(), StageKind::Project);

    let analyzed: Vec<&str> = builder
        .recommendations()
        .iter()
        .map(|r| r.collection.as_str())
        .collect();
    assert_eq!(analyzed, vec!["users", "orders"]);
    assert_eq!(
        builder.recommendations()[0].fields,
        vec!["isActive".to_string(), "name".to_string()]
    );

    assert_eq!(builder.index_failures().len(), 1);
    assert_eq!(builder.index_failures()[0].collection, "missing");

    let tail: Vec<&str> = builder
        .view_logs()
        .iter()
        .skip_while(|entry| !entry.starts_with("Optimized"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        tail,
        vec![
            "Optimized pipeline order (3 stages)",
            "Index recommendations for users: isActive, name",
            "Index analysis failed for missing: collection not found: missing",
            "Index recommendations for orders: isActive, name",
        ]
    );
}

/// Test that index creation keeps going after a failed field
#[tokio::test]
async fn test_create_indexes_collect_and_continue() {
    let inspector = CountingInspector::default();

    let builder = PipelineBuilder::new()
        .optimizer(Optimizer::new(inspector.clone()))
        .collection("users")
        .match_stage(doc! { "bad": 1, "email": "a@b.c" })
        .sort(doc! { "createdAt": -1 })
        .create_indexes()
        .await;

    assert_eq!(inspector.creations.load(Ordering::SeqCst), 3);

    let names: Vec<&str> = builder
        .created_indexes()
        .iter()
        .map(|index| index.name.as_str())
        .collect();
    assert_eq!(names, vec!["idx_email", "idx_createdAt"]);

    assert_eq!(builder.index_failures().len(), 1);
    assert_eq!(builder.index_failures()[0].field.as_deref(), Some("bad"));
}

/// Test that an optimizer-less builder treats both operations as no-ops
#[tokio::test]
async fn test_no_optimizer() {
    let builder = PipelineBuilder::new()
        .collection("users")
        .limit(Some(1))
        .match_stage(doc! { "a": 1 });
    let before = builder.build();

    let builder = builder.optimize().await.create_indexes().await;

    assert_eq!(builder.build(), before);
    assert!(builder.recommendations().is_empty());
    assert!(builder.created_indexes().is_empty());
}

/// Test field extraction across match and sort stages
#[test]
fn test_extract_fields() {
    let plan = PipelineBuilder::new()
        .match_stage(doc! { "status": "A", "qty": { "$gt": 1 } })
        .group(Bson::from("$status"), doc! { "n": { "$sum": 1 } })
        .sort(doc! { "status": 1 })
        .build();

    assert_eq!(
        Optimizer::extract_fields(&plan.pipeline, &INDEX_CANDIDATE_KINDS),
        vec!["status".to_string(), "qty".to_string(), "status".to_string()]
    );
}
