//! Pipeline reordering and index advisory.
//!
//! The optimizer applies one fixed heuristic: `$match` stages first, then
//! `$sort` stages, then everything else, each group keeping its input order.
//! It performs no cost analysis. Index advice compares the fields a pipeline
//! filters and sorts on against what the [`IndexInspector`] reports.
//!
//! ```rust
//! use aggkit_core::{Optimizer, Stage};
//! use bson::doc;
//!
//! let pipeline = vec![
//!     Stage::Limit(10),
//!     Stage::Sort(doc! { "age": 1 }),
//!     Stage::Match(doc! { "isActive": true }),
//! ];
//!
//! let optimized = Optimizer::optimize_pipeline(&pipeline);
//! assert_eq!(optimized[0], Stage::Match(doc! { "isActive": true }));
//! assert_eq!(optimized[2], Stage::Limit(10));
//! ```

use std::fmt;
use std::sync::Arc;

use bson::Document;
use tracing::{debug, info, warn};

use crate::error::{InspectError, InspectResult};
use crate::inspector::IndexInspector;
use crate::stage::{Stage, StageKind};

/// Stage kinds whose fields are considered for indexing.
pub const INDEX_CANDIDATE_KINDS: [StageKind; 2] = [StageKind::Match, StageKind::Sort];

/// Fields of one collection that lack an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecommendation {
    /// The inspected collection.
    pub collection: String,
    /// Candidate fields without an index, in pipeline order.
    pub fields: Vec<String>,
}

/// An index created on behalf of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIndex {
    /// The collection the index was created on.
    pub collection: String,
    /// The indexed field.
    pub field: String,
    /// The index name reported by the backend.
    pub name: String,
}

/// A collaborator call that failed during optimization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFailure {
    /// The collection being inspected or indexed.
    pub collection: String,
    /// The field, for index creation failures.
    pub field: Option<String>,
    /// What went wrong.
    pub error: InspectError,
}

impl IndexFailure {
    /// A failure that affected a whole collection.
    pub fn collection(collection: impl Into<String>, error: InspectError) -> Self {
        Self {
            collection: collection.into(),
            field: None,
            error,
        }
    }

    /// A failure that affected one field of a collection.
    pub fn field(
        collection: impl Into<String>,
        field: impl Into<String>,
        error: InspectError,
    ) -> Self {
        Self {
            collection: collection.into(),
            field: Some(field.into()),
            error,
        }
    }
}

impl fmt::Display for IndexFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "Index creation failed for {}.{}: {}",
                self.collection, field, self.error
            ),
            None => write!(
                f,
                "Index analysis failed for {}: {}",
                self.collection, self.error
            ),
        }
    }
}

/// Outcome of creating indexes on one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCreation {
    /// Indexes that were created, in field order.
    pub created: Vec<CreatedIndex>,
    /// Fields whose creation failed.
    pub failures: Vec<IndexFailure>,
}

impl IndexCreation {
    /// Names of the created indexes.
    pub fn names(&self) -> Vec<&str> {
        self.created.iter().map(|index| index.name.as_str()).collect()
    }

    /// Check if every requested index was created.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reorders pipelines and advises on indexes.
///
/// Holds no state beyond a shared handle to its collaborator, so cloning is
/// cheap and every call is independent.
#[derive(Clone)]
pub struct Optimizer {
    inspector: Arc<dyn IndexInspector>,
}

impl Optimizer {
    /// Create an optimizer backed by the given inspector.
    pub fn new<I>(inspector: I) -> Self
    where
        I: IndexInspector + 'static,
    {
        Self {
            inspector: Arc::new(inspector),
        }
    }

    /// Create an optimizer from an already shared inspector.
    pub fn from_shared(inspector: Arc<dyn IndexInspector>) -> Self {
        Self { inspector }
    }

    /// Get the underlying inspector.
    pub fn inspector(&self) -> &dyn IndexInspector {
        self.inspector.as_ref()
    }

    /// Reorder a pipeline as filters, then sorts, then everything else.
    ///
    /// The partition is stable and the result is a permutation of the input.
    /// Reordering an already reordered pipeline returns it unchanged.
    pub fn optimize_pipeline(pipeline: &[Stage]) -> Vec<Stage> {
        let mut filters = Vec::new();
        let mut sorts = Vec::new();
        let mut others = Vec::new();

        for stage in pipeline {
            match stage.kind() {
                StageKind::Match => filters.push(stage.clone()),
                StageKind::Sort => sorts.push(stage.clone()),
                _ => others.push(stage.clone()),
            }
        }

        debug!(
            filters = filters.len(),
            sorts = sorts.len(),
            others = others.len(),
            "Reordered pipeline"
        );

        filters.extend(sorts);
        filters.extend(others);
        filters
    }

    /// Collect the top-level keys of every stage of the given kinds.
    ///
    /// Keys are returned in stage order. Duplicates are kept.
    pub fn extract_fields(pipeline: &[Stage], kinds: &[StageKind]) -> Vec<String> {
        pipeline
            .iter()
            .filter(|stage| kinds.contains(&stage.kind()))
            .filter_map(Stage::payload_document)
            .flat_map(|payload| payload.keys().cloned())
            .collect()
    }

    /// Return the candidate fields that have no index on a collection.
    ///
    /// Candidate order and duplicates are preserved.
    pub async fn analyze_and_recommend_indexes(
        &self,
        collection: &str,
        fields: &[String],
    ) -> InspectResult<Vec<String>> {
        let indexed = self.inspector.indexed_fields(collection).await?;

        let missing: Vec<String> = fields
            .iter()
            .filter(|field| !indexed.contains(field.as_str()))
            .cloned()
            .collect();

        debug!(
            collection = %collection,
            candidates = fields.len(),
            missing = missing.len(),
            "Analyzed indexes"
        );

        Ok(missing)
    }

    /// Create an ascending single-field index for each field.
    ///
    /// Fields are attempted in order. A failure is recorded and the
    /// remaining fields are still attempted.
    pub async fn create_indexes(&self, collection: &str, fields: &[String]) -> IndexCreation {
        let mut report = IndexCreation::default();

        for field in fields {
            match self.inspector.create_index(collection, field).await {
                Ok(name) => {
                    info!(collection = %collection, field = %field, index = %name, "Created index");
                    report.created.push(CreatedIndex {
                        collection: collection.to_string(),
                        field: field.clone(),
                        name,
                    });
                }
                Err(error) => {
                    warn!(collection = %collection, field = %field, error = %error, "Index creation failed");
                    report
                        .failures
                        .push(IndexFailure::field(collection, field.as_str(), error));
                }
            }
        }

        report
    }

    /// Get storage statistics for a collection from the collaborator.
    pub async fn collection_stats(&self, collection: &str) -> InspectResult<Option<Document>> {
        self.inspector.collection_stats(collection).await
    }
}

impl fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Optimizer").finish_non_exhaustive()
    }
}
