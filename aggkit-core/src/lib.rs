//! # aggkit-core
//!
//! Fluent MongoDB aggregation pipeline builder with an advisory optimizer.
//!
//! This crate provides:
//! - A closed [`Stage`] model that renders the literal `$match`, `$lookup`, ...
//!   documents a driver sends to the server
//! - [`PipelineBuilder`], which appends stages only for present arguments
//!   and can record a human-readable debug log
//! - [`Optimizer`], which moves `$match` and `$sort` stages to the front and
//!   recommends or creates indexes for the fields they use
//! - The [`IndexInspector`] collaborator trait the optimizer talks to, with
//!   an in-memory [`StaticInspector`]
//!
//! No network code lives here; `aggkit-mongodb` implements
//! [`IndexInspector`] on top of the official driver.
//!
//! ## Building a pipeline
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
//!     .build();
//!
//! assert_eq!(
//!     plan.to_documents(),
//!     vec![
//!         doc! { "$match": { "isActive": true } },
//!         doc! { "$sort": { "age": 1 } },
//!         doc! { "$limit": 10_i64 },
//!     ]
//! );
//! ```
//!
//! ## Optimizing
//!
//! ```rust
//! use aggkit_core::{Optimizer, PipelineBuilder, StaticInspector};
//! use bson::doc;
//!
//! # tokio_test::block_on(async {
//! let inspector = StaticInspector::new().with_indexes("users", ["isActive"]);
//!
//! let builder = PipelineBuilder::new()
//!     .optimizer(Optimizer::new(inspector))
//!     .collection("users")
//!     .limit(Some(10))
//!     .match_stage(doc! { "isActive": true, "createdAt": { "$gte": 0 } })
//!     .optimize()
//!     .await;
//!
//! assert_eq!(builder.recommendations()[0].fields, vec!["createdAt".to_string()]);
//! # });
//! ```

pub mod builder;
pub mod config;
pub mod debug_log;
pub mod error;
pub mod inspector;
pub mod logging;
pub mod optimizer;
pub mod stage;

pub use builder::{AggregatePlan, PipelineBuilder};
pub use config::BuilderConfig;
pub use debug_log::DebugLog;
pub use error::{ConfigError, InspectError, InspectResult};
pub use inspector::{IndexInspector, StaticInspector};
pub use optimizer::{
    CreatedIndex, INDEX_CANDIDATE_KINDS, IndexCreation, IndexFailure, IndexRecommendation,
    Optimizer,
};
pub use stage::{LookupSpec, Stage, StageKind};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        AggregatePlan, IndexInspector, Optimizer, PipelineBuilder, Stage, StageKind,
        StaticInspector,
    };
    pub use bson::{Bson, Document, doc};
}
