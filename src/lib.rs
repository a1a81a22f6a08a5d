//! # aggkit
//!
//! A fluent builder for MongoDB aggregation pipelines with a small advisory
//! optimizer.
//!
//! aggkit provides:
//! - One builder method per aggregation stage, each skipping absent input
//! - An optional debug log of every builder operation
//! - A fixed reordering heuristic that runs `$match` and `$sort` first
//! - Index recommendations and creation for filtered and sorted fields
//! - A MongoDB driver binding (feature `mongodb`, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use aggkit::prelude::*;
//!
//! let plan = PipelineBuilder::new()
//!     .collection("users")
//!     .match_stage(doc! { "isActive": true })
//!     .sort(doc! { "age": 1 })
//!     .limit(Some(10))
//!     .build();
//!
//! assert_eq!(plan.collections, vec!["users".to_string()]);
//! assert_eq!(plan.pipeline.len(), 3);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use aggkit_core::*;

/// MongoDB driver binding.
#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
pub mod mongodb {
    pub use aggkit_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use aggkit_core::prelude::*;

    #[cfg(feature = "mongodb")]
    pub use aggkit_mongodb::MongoClient;
}
