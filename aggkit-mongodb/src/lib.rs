//! # aggkit-mongodb
//!
//! MongoDB driver binding for aggkit.
//!
//! This crate provides:
//! - Connection configuration, from code or `AGGKIT_MONGODB_*` variables
//! - A pooled [`MongoClient`] that can run a built [`AggregatePlan`](aggkit_core::AggregatePlan)
//! - An [`IndexInspector`](aggkit_core::IndexInspector) implementation that
//!   lists indexes, creates single-field indexes and reads `collStats`
//!
//! ## Example
//!
//! ```rust,ignore
//! use aggkit_core::{Optimizer, PipelineBuilder};
//! use aggkit_mongodb::{MongoClient, doc};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()
//!         .await?;
//!
//!     let builder = PipelineBuilder::new()
//!         .debug(true)
//!         .optimizer(Optimizer::new(client.clone()))
//!         .collection("orders")
//!         .sort(doc! { "placedAt": -1 })
//!         .match_stage(doc! { "status": "shipped" })
//!         .optimize()
//!         .await;
//!
//!     for entry in builder.view_logs() {
//!         println!("{entry}");
//!     }
//!
//!     let orders = client.aggregate(&builder.build()).await?;
//!     println!("{} orders", orders.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod inspector;

pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder};
pub use error::{MongoError, MongoResult};
pub use inspector::{indexed_field_names, single_field_index};
