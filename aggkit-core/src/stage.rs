//! Aggregation stage model.
//!
//! A [`Stage`] is one step of a MongoDB aggregation pipeline. Each variant
//! carries exactly the payload its keyword needs and renders to the literal
//! document shape the server expects:
//!
//! ```rust
//! use aggkit_core::Stage;
//! use bson::doc;
//!
//! let stage = Stage::Match(doc! { "status": "active" });
//! assert_eq!(stage.to_document(), doc! { "$match": { "status": "active" } });
//!
//! let stage = Stage::Sample(25);
//! assert_eq!(stage.to_document(), doc! { "$sample": { "size": 25_i64 } });
//! ```

use std::fmt;

use bson::{Bson, Document, doc};
use serde::{Serialize, Serializer};

/// The kind of an aggregation stage, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    /// `$match`
    Match,
    /// `$sort`
    Sort,
    /// `$limit`
    Limit,
    /// `$skip`
    Skip,
    /// `$lookup`
    Lookup,
    /// `$group`
    Group,
    /// `$addFields`
    AddFields,
    /// `$bucket`
    Bucket,
    /// `$bucketAuto`
    BucketAuto,
    /// `$count`
    Count,
    /// `$facet`
    Facet,
    /// `$project`
    Project,
    /// `$unwind`
    Unwind,
    /// `$out`
    Out,
    /// `$replaceRoot`
    ReplaceRoot,
    /// `$merge`
    Merge,
    /// `$redact`
    Redact,
    /// `$sample`
    Sample,
}

impl StageKind {
    /// The stage operator as it appears in a pipeline document.
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Match => "$match",
            Self::Sort => "$sort",
            Self::Limit => "$limit",
            Self::Skip => "$skip",
            Self::Lookup => "$lookup",
            Self::Group => "$group",
            Self::AddFields => "$addFields",
            Self::Bucket => "$bucket",
            Self::BucketAuto => "$bucketAuto",
            Self::Count => "$count",
            Self::Facet => "$facet",
            Self::Project => "$project",
            Self::Unwind => "$unwind",
            Self::Out => "$out",
            Self::ReplaceRoot => "$replaceRoot",
            Self::Merge => "$merge",
            Self::Redact => "$redact",
            Self::Sample => "$sample",
        }
    }

    /// Check if this kind filters documents (`$match`).
    pub fn is_filter(self) -> bool {
        matches!(self, Self::Match)
    }

    /// Check if this kind orders documents (`$sort`).
    pub fn is_sort(self) -> bool {
        matches!(self, Self::Sort)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

/// Payload of a `$lookup` stage (left outer join).
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSpec {
    /// The foreign collection to join.
    pub from: String,
    /// Field of the input documents.
    pub local_field: String,
    /// Field of the foreign documents.
    pub foreign_field: String,
    /// Name of the output array field.
    pub as_field: String,
}

impl LookupSpec {
    /// Create a new lookup specification.
    pub fn new(
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        }
    }
}

/// A single aggregation pipeline stage.
///
/// Stages are plain data. Inner documents are schema-free since aggregation
/// expressions are themselves open-ended; no validation of their contents is
/// performed.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filter documents with a query predicate.
    Match(Document),
    /// Order documents by `field: 1 | -1` pairs.
    Sort(Document),
    /// Pass only the first `n` documents.
    Limit(i64),
    /// Skip the first `n` documents.
    Skip(i64),
    /// Join against another collection.
    Lookup(LookupSpec),
    /// Group documents by a key and compute accumulators.
    Group {
        /// The `_id` expression.
        group_by: Bson,
        /// Accumulator fields.
        accumulators: Document,
    },
    /// Add computed fields.
    AddFields(Document),
    /// Categorize documents into explicit buckets.
    Bucket(Document),
    /// Categorize documents into a number of automatic buckets.
    BucketAuto(Document),
    /// Count documents into a single named field.
    Count(String),
    /// Run several sub-pipelines over the same input.
    Facet(Document),
    /// Reshape documents.
    Project(Document),
    /// Deconstruct an array field.
    Unwind {
        /// Field path of the array, e.g. `$items`.
        path: String,
        /// Extra options such as `preserveNullAndEmptyArrays`.
        options: Option<Document>,
    },
    /// Write the results into a collection.
    Out(String),
    /// Promote an embedded document to the top level.
    ReplaceRoot(Document),
    /// Merge the results into a collection.
    Merge(Document),
    /// Restrict document content by a redaction expression.
    Redact(Bson),
    /// Randomly select `size` documents.
    Sample(i64),
}

impl Stage {
    /// Get the kind of this stage.
    pub fn kind(&self) -> StageKind {
        match self {
            Self::Match(_) => StageKind::Match,
            Self::Sort(_) => StageKind::Sort,
            Self::Limit(_) => StageKind::Limit,
            Self::Skip(_) => StageKind::Skip,
            Self::Lookup(_) => StageKind::Lookup,
            Self::Group { .. } => StageKind::Group,
            Self::AddFields(_) => StageKind::AddFields,
            Self::Bucket(_) => StageKind::Bucket,
            Self::BucketAuto(_) => StageKind::BucketAuto,
            Self::Count(_) => StageKind::Count,
            Self::Facet(_) => StageKind::Facet,
            Self::Project(_) => StageKind::Project,
            Self::Unwind { .. } => StageKind::Unwind,
            Self::Out(_) => StageKind::Out,
            Self::ReplaceRoot(_) => StageKind::ReplaceRoot,
            Self::Merge(_) => StageKind::Merge,
            Self::Redact(_) => StageKind::Redact,
            Self::Sample(_) => StageKind::Sample,
        }
    }

    /// Get the document payload of stages that carry one directly.
    ///
    /// Returns `None` for scalar payloads and for `$group`, `$lookup`,
    /// `$unwind`, `$replaceRoot` and `$redact`, whose payloads are assembled
    /// from several parts or wrapped.
    pub fn payload_document(&self) -> Option<&Document> {
        match self {
            Self::Match(d)
            | Self::Sort(d)
            | Self::AddFields(d)
            | Self::Bucket(d)
            | Self::BucketAuto(d)
            | Self::Facet(d)
            | Self::Project(d)
            | Self::Merge(d) => Some(d),
            _ => None,
        }
    }

    /// The value stored under the stage operator.
    pub fn payload(&self) -> Bson {
        match self {
            Self::Match(d)
            | Self::Sort(d)
            | Self::AddFields(d)
            | Self::Bucket(d)
            | Self::BucketAuto(d)
            | Self::Facet(d)
            | Self::Project(d)
            | Self::Merge(d) => Bson::Document(d.clone()),
            Self::Limit(n) | Self::Skip(n) => Bson::Int64(*n),
            Self::Lookup(spec) => Bson::Document(doc! {
                "from": &spec.from,
                "localField": &spec.local_field,
                "foreignField": &spec.foreign_field,
                "as": &spec.as_field,
            }),
            Self::Group {
                group_by,
                accumulators,
            } => {
                let mut group = doc! { "_id": group_by.clone() };
                for (key, value) in accumulators {
                    if key != "_id" {
                        group.insert(key.clone(), value.clone());
                    }
                }
                Bson::Document(group)
            }
            Self::Count(field) | Self::Out(field) => Bson::String(field.clone()),
            Self::Unwind { path, options } => match options {
                None => Bson::String(path.clone()),
                Some(options) => {
                    let mut unwind = doc! { "path": path.as_str() };
                    for (key, value) in options {
                        if key != "path" {
                            unwind.insert(key.clone(), value.clone());
                        }
                    }
                    Bson::Document(unwind)
                }
            },
            Self::ReplaceRoot(new_root) => Bson::Document(doc! { "newRoot": new_root.clone() }),
            Self::Redact(expression) => expression.clone(),
            Self::Sample(size) => Bson::Document(doc! { "size": *size }),
        }
    }

    /// Render the stage as a pipeline document, e.g. `{ "$limit": 10 }`.
    pub fn to_document(&self) -> Document {
        let mut stage = Document::new();
        stage.insert(self.kind().operator(), self.payload());
        stage
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

impl From<Stage> for Document {
    fn from(stage: Stage) -> Self {
        stage.to_document()
    }
}

impl Serialize for Stage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_document().serialize(serializer)
    }
}
