//! Fluent aggregation pipeline builder.
//!
//! Every stage method takes its payload as an explicit option. `None` skips
//! the stage entirely; any present value, including `Some(0)` and
//! `Some("")`, appends exactly one stage at the end of the pipeline.
//!
//! ```rust
//! use aggkit_core::PipelineBuilder;
//! use bson::doc;
//!
//! let plan = PipelineBuilder::new()
//!     .collection("users")
//!     .match_stage(doc! { "isActive": true })
//!     .sort(doc! { "age": 1 })
//!     .limit(Some(10))
//!     .skip(None)
//!     .build();
//!
//! assert_eq!(plan.pipeline.len(), 3);
//! assert_eq!(plan.collections, vec!["users".to_string()]);
//! ```

use bson::{Bson, Document};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::BuilderConfig;
use crate::debug_log::DebugLog;
use crate::optimizer::{
    CreatedIndex, INDEX_CANDIDATE_KINDS, IndexFailure, IndexRecommendation, Optimizer,
};
use crate::stage::{LookupSpec, Stage};

/// A finished pipeline together with the collections it targets.
///
/// This is a snapshot: it never changes when the builder that produced it
/// keeps being used.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatePlan {
    /// Stages in execution order.
    pub pipeline: Vec<Stage>,
    /// Selected collection names, in selection order.
    pub collections: Vec<String>,
}

impl AggregatePlan {
    /// Render the pipeline as the documents a driver expects.
    pub fn to_documents(&self) -> Vec<Document> {
        self.pipeline.iter().map(Stage::to_document).collect()
    }

    /// The first selected collection, which the pipeline runs against.
    pub fn primary_collection(&self) -> Option<&str> {
        self.collections.first().map(String::as_str)
    }
}

/// Builder that accumulates stages and collection names.
///
/// A builder is owned by one caller for the lifetime of one query. Stage
/// methods never fail; [`optimize`](Self::optimize) and
/// [`create_indexes`](Self::create_indexes) record collaborator failures
/// instead of aborting.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    collections: Vec<String>,
    log: DebugLog,
    optimizer: Option<Optimizer>,
    recommendations: Vec<IndexRecommendation>,
    created: Vec<CreatedIndex>,
    failures: Vec<IndexFailure>,
}

impl PipelineBuilder {
    /// Create a builder with debug mode off and no optimizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from a configuration.
    pub fn with_config(config: BuilderConfig) -> Self {
        Self::new().debug(config.debug)
    }

    /// Enable or disable the debug log.
    pub fn debug(mut self, enabled: bool) -> Self {
        self.log.set_enabled(enabled);
        self
    }

    /// Attach an optimizer used by [`optimize`](Self::optimize) and
    /// [`create_indexes`](Self::create_indexes).
    pub fn optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    fn push(mut self, stage: Stage) -> Self {
        debug!(stage = %stage.kind(), position = self.stages.len(), "Appended stage");
        self.log
            .record_with(|| format!("Added {} stage: {}", stage.kind(), stage.payload()));
        self.stages.push(stage);
        self
    }

    /// Select a collection.
    pub fn collection(self, name: impl Into<String>) -> Self {
        self.collections([name])
    }

    /// Select any number of collections, in order. Duplicates are kept.
    pub fn collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start = self.collections.len();
        self.collections.extend(names.into_iter().map(Into::into));

        let added = &self.collections[start..];
        if added.is_empty() {
            return self;
        }
        debug!(collections = ?added, "Selected collections");
        self.log
            .record_with(|| format!("Selected collections: {}", added.join(", ")));
        self
    }

    /// Add a `$match` stage.
    pub fn match_stage(self, criteria: impl Into<Option<Document>>) -> Self {
        match criteria.into() {
            Some(criteria) => self.push(Stage::Match(criteria)),
            None => self,
        }
    }

    /// Add a `$sort` stage.
    pub fn sort(self, sort: impl Into<Option<Document>>) -> Self {
        match sort.into() {
            Some(sort) => self.push(Stage::Sort(sort)),
            None => self,
        }
    }

    /// Add a `$limit` stage.
    pub fn limit(self, limit: Option<i64>) -> Self {
        match limit {
            Some(limit) => self.push(Stage::Limit(limit)),
            None => self,
        }
    }

    /// Add a `$skip` stage.
    pub fn skip(self, skip: Option<i64>) -> Self {
        match skip {
            Some(skip) => self.push(Stage::Skip(skip)),
            None => self,
        }
    }

    /// Add a `$lookup` stage. Skipped when `from` is absent.
    pub fn lookup<'a>(
        self,
        from: impl Into<Option<&'a str>>,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> Self {
        match from.into() {
            Some(from) => self.push(Stage::Lookup(LookupSpec::new(
                from,
                local_field,
                foreign_field,
                as_field,
            ))),
            None => self,
        }
    }

    /// Add a `$group` stage. Skipped unless both parts are present.
    ///
    /// `Bson::Null` is a present group key (one group for all documents).
    pub fn group(
        self,
        group_by: impl Into<Option<Bson>>,
        accumulators: impl Into<Option<Document>>,
    ) -> Self {
        match (group_by.into(), accumulators.into()) {
            (Some(group_by), Some(accumulators)) => self.push(Stage::Group {
                group_by,
                accumulators,
            }),
            _ => self,
        }
    }

    /// Add an `$addFields` stage.
    pub fn add_fields(self, fields: impl Into<Option<Document>>) -> Self {
        match fields.into() {
            Some(fields) => self.push(Stage::AddFields(fields)),
            None => self,
        }
    }

    /// Add a `$bucket` stage.
    pub fn bucket(self, spec: impl Into<Option<Document>>) -> Self {
        match spec.into() {
            Some(spec) => self.push(Stage::Bucket(spec)),
            None => self,
        }
    }

    /// Add a `$bucketAuto` stage.
    pub fn bucket_auto(self, spec: impl Into<Option<Document>>) -> Self {
        match spec.into() {
            Some(spec) => self.push(Stage::BucketAuto(spec)),
            None => self,
        }
    }

    /// Add a `$count` stage writing into `field`.
    pub fn count<'a>(self, field: impl Into<Option<&'a str>>) -> Self {
        match field.into() {
            Some(field) => self.push(Stage::Count(field.to_string())),
            None => self,
        }
    }

    /// Add a `$facet` stage.
    pub fn facet(self, spec: impl Into<Option<Document>>) -> Self {
        match spec.into() {
            Some(spec) => self.push(Stage::Facet(spec)),
            None => self,
        }
    }

    /// Add a `$project` stage.
    pub fn project(self, projection: impl Into<Option<Document>>) -> Self {
        match projection.into() {
            Some(projection) => self.push(Stage::Project(projection)),
            None => self,
        }
    }

    /// Add an `$unwind` stage. Skipped when `path` is absent.
    ///
    /// With options the stage takes the document form
    /// `{ "path": ..., ...options }`.
    pub fn unwind<'a>(
        self,
        path: impl Into<Option<&'a str>>,
        options: impl Into<Option<Document>>,
    ) -> Self {
        match path.into() {
            Some(path) => self.push(Stage::Unwind {
                path: path.to_string(),
                options: options.into(),
            }),
            None => self,
        }
    }

    /// Add an `$out` stage.
    pub fn out<'a>(self, collection: impl Into<Option<&'a str>>) -> Self {
        match collection.into() {
            Some(collection) => self.push(Stage::Out(collection.to_string())),
            None => self,
        }
    }

    /// Add a `$replaceRoot` stage.
    pub fn replace_root(self, new_root: impl Into<Option<Document>>) -> Self {
        match new_root.into() {
            Some(new_root) => self.push(Stage::ReplaceRoot(new_root)),
            None => self,
        }
    }

    /// Add a `$merge` stage.
    pub fn merge(self, spec: impl Into<Option<Document>>) -> Self {
        match spec.into() {
            Some(spec) => self.push(Stage::Merge(spec)),
            None => self,
        }
    }

    /// Add a `$redact` stage.
    pub fn redact(self, expression: impl Into<Option<Bson>>) -> Self {
        match expression.into() {
            Some(expression) => self.push(Stage::Redact(expression)),
            None => self,
        }
    }

    /// Add a `$sample` stage.
    pub fn sample(self, size: Option<i64>) -> Self {
        match size {
            Some(size) => self.push(Stage::Sample(size)),
            None => self,
        }
    }

    /// Reorder the pipeline and record index recommendations.
    ///
    /// Without an optimizer this returns the builder unchanged. Collections
    /// are inspected one at a time in selection order; a collection whose
    /// inspection fails is recorded in [`index_failures`](Self::index_failures)
    /// and the remaining collections are still inspected. Recommendations from
    /// a previous call are replaced.
    pub async fn optimize(mut self) -> Self {
        let Some(optimizer) = self.optimizer.clone() else {
            return self;
        };

        self.stages = Optimizer::optimize_pipeline(&self.stages);
        let stage_count = self.stages.len();
        self.log
            .record_with(|| format!("Optimized pipeline order ({} stages)", stage_count));

        let fields = Optimizer::extract_fields(&self.stages, &INDEX_CANDIDATE_KINDS);
        self.recommendations.clear();

        for collection in self.collections.clone() {
            match optimizer
                .analyze_and_recommend_indexes(&collection, &fields)
                .await
            {
                Ok(missing) => {
                    debug!(collection = %collection, missing = ?missing, "Index recommendation");
                    self.log.record_with(|| {
                        let listed = if missing.is_empty() {
                            "none".to_string()
                        } else {
                            missing.join(", ")
                        };
                        format!("Index recommendations for {}: {}", collection, listed)
                    });
                    self.recommendations.push(IndexRecommendation {
                        collection,
                        fields: missing,
                    });
                }
                Err(error) => {
                    warn!(collection = %collection, error = %error, "Index analysis failed");
                    let failure = IndexFailure::collection(collection, error);
                    self.log.record_with(|| failure.to_string());
                    self.failures.push(failure);
                }
            }
        }

        self
    }

    /// Create an index for every filtered or sorted field on every selected
    /// collection.
    ///
    /// Without an optimizer this returns the builder unchanged. A failed
    /// creation is recorded and the remaining fields and collections are
    /// still attempted.
    pub async fn create_indexes(mut self) -> Self {
        let Some(optimizer) = self.optimizer.clone() else {
            return self;
        };

        let fields = Optimizer::extract_fields(&self.stages, &INDEX_CANDIDATE_KINDS);

        for collection in self.collections.clone() {
            let report = optimizer.create_indexes(&collection, &fields).await;

            if !report.created.is_empty() {
                self.log.record_with(|| {
                    format!(
                        "Created indexes on {}: {}",
                        collection,
                        report.names().join(", ")
                    )
                });
            }
            for failure in &report.failures {
                self.log.record_with(|| failure.to_string());
            }

            self.created.extend(report.created);
            self.failures.extend(report.failures);
        }

        self
    }

    /// Snapshot the pipeline and selected collections.
    pub fn build(&self) -> AggregatePlan {
        AggregatePlan {
            pipeline: self.stages.clone(),
            collections: self.collections.clone(),
        }
    }

    /// The debug log entries, empty unless debug mode is on.
    pub fn view_logs(&self) -> &[String] {
        self.log.entries()
    }

    /// The stages accumulated so far.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The collections selected so far.
    pub fn selected_collections(&self) -> &[String] {
        &self.collections
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Check if no stage has been added.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Check if an optimizer is attached.
    pub fn has_optimizer(&self) -> bool {
        self.optimizer.is_some()
    }

    /// Recommendations from the last [`optimize`](Self::optimize) call.
    pub fn recommendations(&self) -> &[IndexRecommendation] {
        &self.recommendations
    }

    /// Indexes created by [`create_indexes`](Self::create_indexes).
    pub fn created_indexes(&self) -> &[CreatedIndex] {
        &self.created
    }

    /// Collaborator failures recorded so far.
    pub fn index_failures(&self) -> &[IndexFailure] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InspectError;
    use crate::inspector::StaticInspector;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_arguments_skip() {
        let builder = PipelineBuilder::new()
            .match_stage(None)
            .sort(None)
            .limit(None)
            .skip(None)
            .lookup(None, "a", "b", "c")
            .group(None, doc! { "n": { "$sum": 1 } })
            .group(Bson::from("$a"), None)
            .add_fields(None)
            .bucket(None)
            .bucket_auto(None)
            .count(None)
            .facet(None)
            .project(None)
            .unwind(None, doc! { "preserveNullAndEmptyArrays": true })
            .out(None)
            .replace_root(None)
            .merge(None)
            .redact(None)
            .sample(None);

        assert!(builder.is_empty());
        assert!(builder.build().pipeline.is_empty());
    }

    #[test]
    fn test_present_arguments_append_in_order() {
        let builder = PipelineBuilder::new()
            .match_stage(doc! { "a": 1 })
            .sort(doc! { "a": -1 })
            .limit(Some(10))
            .skip(Some(5))
            .lookup("orders", "_id", "userId", "orders")
            .group(Bson::from("$a"), doc! { "n": { "$sum": 1 } })
            .add_fields(doc! { "b": 2 })
            .bucket(doc! { "groupBy": "$price", "boundaries": [0, 100] })
            .bucket_auto(doc! { "groupBy": "$price", "buckets": 4 })
            .count("total")
            .facet(doc! { "byTag": [{ "$sortByCount": "$tag" }] })
            .project(doc! { "a": 1 })
            .unwind("$items", None)
            .out("archive")
            .replace_root(doc! { "x": "$x" })
            .merge(doc! { "into": "stats" })
            .redact(Bson::from("$$KEEP"))
            .sample(Some(3));

        let operators: Vec<&str> = builder
            .stages()
            .iter()
            .map(|stage| stage.kind().operator())
            .collect();

        assert_eq!(
            operators,
            vec![
                "$match",
                "$sort",
                "$limit",
                "$skip",
                "$lookup",
                "$group",
                "$addFields",
                "$bucket",
                "$bucketAuto",
                "$count",
                "$facet",
                "$project",
                "$unwind",
                "$out",
                "$replaceRoot",
                "$merge",
                "$redact",
                "$sample",
            ]
        );
    }

    #[test]
    fn test_zero_and_empty_values_are_present() {
        let plan = PipelineBuilder::new()
            .limit(Some(0))
            .skip(Some(0))
            .sample(Some(0))
            .count("")
            .match_stage(doc! {})
            .project(Document::new())
            .build();

        assert_eq!(
            plan.pipeline,
            vec![
                Stage::Limit(0),
                Stage::Skip(0),
                Stage::Sample(0),
                Stage::Count(String::new()),
                Stage::Match(doc! {}),
                Stage::Project(Document::new()),
            ]
        );
    }

    #[test]
    fn test_null_group_key_is_present() {
        let plan = PipelineBuilder::new()
            .group(Bson::Null, doc! { "total": { "$sum": "$amount" } })
            .build();

        assert_eq!(
            plan.to_documents(),
            vec![doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount" } } }]
        );
    }

    #[test]
    fn test_collections_keep_order_and_duplicates() {
        let builder = PipelineBuilder::new()
            .collection("users")
            .collection("orders")
            .collections(["users"])
            .collections(Vec::<String>::new());

        assert_eq!(builder.selected_collections(), ["users", "orders", "users"]);
    }

    #[test]
    fn test_build_is_a_snapshot() {
        let builder = PipelineBuilder::new().collection("users").limit(Some(1));
        let first = builder.build();
        assert_eq!(builder.build(), first);

        let builder = builder.skip(Some(2)).collection("orders");
        assert_eq!(first.pipeline, vec![Stage::Limit(1)]);
        assert_eq!(first.collections, vec!["users".to_string()]);
        assert_eq!(builder.build().pipeline.len(), 2);
    }

    #[test]
    fn test_empty_builder() {
        let plan = PipelineBuilder::new().build();
        assert_eq!(plan, AggregatePlan::default());
        assert_eq!(plan.primary_collection(), None);
    }

    #[test]
    fn test_debug_log() {
        let builder = PipelineBuilder::new()
            .debug(true)
            .collection("users")
            .match_stage(doc! { "isActive": true })
            .limit(None);

        let logs = builder.view_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0], "Selected collections: users");
        assert!(logs[1].starts_with("Added $match stage:"));
        assert!(logs[1].contains("isActive"));
    }

    #[test]
    fn test_empty_collection_selection_is_not_logged() {
        let builder = PipelineBuilder::new()
            .debug(true)
            .collections(Vec::<String>::new())
            .collection("users");

        assert_eq!(builder.selected_collections(), ["users"]);
        assert_eq!(builder.view_logs(), ["Selected collections: users"]);
    }

    #[test]
    fn test_debug_log_disabled() {
        let builder = PipelineBuilder::with_config(BuilderConfig::default())
            .collection("users")
            .match_stage(doc! { "isActive": true })
            .sort(doc! { "age": 1 });

        assert!(builder.view_logs().is_empty());
        assert_eq!(builder.len(), 2);
    }

    #[tokio::test]
    async fn test_optimize_without_optimizer_is_noop() {
        let builder = PipelineBuilder::new()
            .debug(true)
            .collection("users")
            .limit(Some(5))
            .match_stage(doc! { "a": 1 })
            .optimize()
            .await
            .create_indexes()
            .await;

        assert!(!builder.has_optimizer());
        assert_eq!(builder.stages()[0], Stage::Limit(5));
        assert_eq!(builder.view_logs().len(), 3);
        assert!(builder.recommendations().is_empty());
    }

    #[tokio::test]
    async fn test_optimize_reorders_and_recommends() {
        let inspector = StaticInspector::new()
            .with_indexes("users", ["isActive"])
            .with_indexes("archive", ["isActive", "age"]);

        let builder = PipelineBuilder::new()
            .debug(true)
            .optimizer(Optimizer::new(inspector))
            .collections(["users", "archive"])
            .limit(Some(10))
            .sort(doc! { "age": 1 })
            .match_stage(doc! { "isActive": true })
            .optimize()
            .await;

        assert_eq!(
            builder.stages(),
            [
                Stage::Match(doc! { "isActive": true }),
                Stage::Sort(doc! { "age": 1 }),
                Stage::Limit(10),
            ]
        );
        assert_eq!(
            builder.recommendations(),
            [
                IndexRecommendation {
                    collection: "users".into(),
                    fields: vec!["age".into()],
                },
                IndexRecommendation {
                    collection: "archive".into(),
                    fields: vec![],
                },
            ]
        );

        let logs = builder.view_logs();
        assert!(logs.contains(&"Optimized pipeline order (3 stages)".to_string()));
        assert!(logs.contains(&"Index recommendations for users: age".to_string()));
        assert!(logs.contains(&"Index recommendations for archive: none".to_string()));
    }

    #[tokio::test]
    async fn test_optimize_continues_after_failure() {
        let inspector = StaticInspector::new()
            .fail_on("broken", InspectError::connection("refused"))
            .with_indexes("users", ["a"]);

        let builder = PipelineBuilder::new()
            .debug(true)
            .optimizer(Optimizer::new(inspector))
            .collections(["broken", "users"])
            .match_stage(doc! { "a": 1, "b": 2 })
            .optimize()
            .await;

        assert_eq!(builder.index_failures().len(), 1);
        assert_eq!(builder.index_failures()[0].collection, "broken");
        assert_eq!(builder.index_failures()[0].field, None);
        assert_eq!(builder.recommendations().len(), 1);
        assert_eq!(builder.recommendations()[0].fields, vec!["b".to_string()]);
        assert!(
            builder
                .view_logs()
                .contains(&"Index analysis failed for broken: connection error: refused".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_indexes() {
        let inspector = StaticInspector::new();

        let builder = PipelineBuilder::new()
            .debug(true)
            .optimizer(Optimizer::new(inspector.clone()))
            .collection("users")
            .match_stage(doc! { "isActive": true })
            .sort(doc! { "createdAt": -1 })
            .create_indexes()
            .await;

        let names: Vec<&str> = builder
            .created_indexes()
            .iter()
            .map(|index| index.name.as_str())
            .collect();
        assert_eq!(names, vec!["isActive_1", "createdAt_1"]);
        assert!(inspector.is_indexed("users", "createdAt"));
        assert_eq!(
            builder.view_logs().last().map(String::as_str),
            Some("Created indexes on users: isActive_1, createdAt_1")
        );
    }

    #[tokio::test]
    async fn test_create_indexes_isolates_collections() {
        let inspector = StaticInspector::new().fail_on("locked", InspectError::Timeout(100));

        let builder = PipelineBuilder::new()
            .optimizer(Optimizer::new(inspector))
            .collections(["locked", "users"])
            .match_stage(doc! { "a": 1 })
            .create_indexes()
            .await;

        assert_eq!(builder.created_indexes().len(), 1);
        assert_eq!(builder.created_indexes()[0].collection, "users");
        assert_eq!(builder.index_failures().len(), 1);
        assert_eq!(builder.index_failures()[0].field.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_create_indexes_all_failed_logs_only_failures() {
        let inspector = StaticInspector::new().fail_on("users", InspectError::Timeout(1));

        let builder = PipelineBuilder::new()
            .debug(true)
            .optimizer(Optimizer::new(inspector))
            .collection("users")
            .match_stage(doc! { "a": 1 })
            .create_indexes()
            .await;

        assert!(builder.created_indexes().is_empty());
        let logs = builder.view_logs();
        assert!(!logs.iter().any(|entry| entry.starts_with("Created indexes")));
        assert_eq!(
            logs.last().map(String::as_str),
            Some("Index creation failed for users.a: operation timed out after 1ms")
        );
    }
}
