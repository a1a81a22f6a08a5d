//! The index-inspection collaborator consulted by the optimizer.
//!
//! aggkit never talks to a server itself. Anything that can report the
//! indexed fields of a collection and create a single-field index can back
//! the [`Optimizer`](crate::Optimizer): the MongoDB driver binding in
//! `aggkit-mongodb`, or the in-memory [`StaticInspector`] below.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use parking_lot::RwLock;

use crate::error::{InspectError, InspectResult};

/// Read access to index metadata plus single-field index creation.
#[async_trait]
pub trait IndexInspector: Send + Sync {
    /// Get the names of the fields currently indexed on a collection.
    async fn indexed_fields(&self, collection: &str) -> InspectResult<HashSet<String>>;

    /// Create an ascending single-field index and return its name.
    async fn create_index(&self, collection: &str, field: &str) -> InspectResult<String>;

    /// Get storage statistics for a collection, if the backend has them.
    async fn collection_stats(&self, _collection: &str) -> InspectResult<Option<Document>> {
        Ok(None)
    }
}

#[derive(Debug, Default)]
struct StaticState {
    indexes: HashMap<String, HashSet<String>>,
    failing: HashMap<String, InspectError>,
}

/// An in-memory inspector that tracks indexed fields per collection.
///
/// Cloning shares the underlying state. Collections can be made to fail so
/// callers can observe how errors are reported.
#[derive(Debug, Clone, Default)]
pub struct StaticInspector {
    state: Arc<RwLock<StaticState>>,
}

impl StaticInspector {
    /// Create an empty inspector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fields as indexed on a collection.
    pub fn with_indexes<I, S>(self, collection: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .write()
            .indexes
            .entry(collection.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Make every operation on a collection fail with the given error.
    pub fn fail_on(self, collection: impl Into<String>, error: InspectError) -> Self {
        self.state.write().failing.insert(collection.into(), error);
        self
    }

    /// Check if a field is indexed on a collection.
    pub fn is_indexed(&self, collection: &str, field: &str) -> bool {
        self.state
            .read()
            .indexes
            .get(collection)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Number of indexed fields registered for a collection.
    pub fn index_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .indexes
            .get(collection)
            .map_or(0, HashSet::len)
    }

    fn check(&self, collection: &str) -> InspectResult<()> {
        match self.state.read().failing.get(collection) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IndexInspector for StaticInspector {
    async fn indexed_fields(&self, collection: &str) -> InspectResult<HashSet<String>> {
        self.check(collection)?;
        Ok(self
            .state
            .read()
            .indexes
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_index(&self, collection: &str, field: &str) -> InspectResult<String> {
        self.check(collection)?;
        self.state
            .write()
            .indexes
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        Ok(format!("{}_1", field))
    }

    async fn collection_stats(&self, collection: &str) -> InspectResult<Option<Document>> {
        self.check(collection)?;
        let indexes = self.index_count(collection) as i64;
        Ok(Some(bson::doc! { "ns": collection, "nindexes": indexes }))
    }
}
