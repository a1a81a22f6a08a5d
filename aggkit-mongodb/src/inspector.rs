//! [`IndexInspector`] backed by the MongoDB driver.

use std::collections::HashSet;

use aggkit_core::{IndexInspector, InspectResult};
use async_trait::async_trait;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::IndexModel;
use tracing::debug;

use crate::client::MongoClient;
use crate::error::{MongoError, MongoResult};

/// Collect every field named in the key pattern of any index.
///
/// Compound indexes contribute all of their fields.
pub fn indexed_field_names(models: &[IndexModel]) -> HashSet<String> {
    models
        .iter()
        .flat_map(|model| model.keys.keys().cloned())
        .collect()
}

/// Model for an ascending single-field index.
pub fn single_field_index(field: &str) -> IndexModel {
    let mut keys = Document::new();
    keys.insert(field, 1);
    IndexModel::builder().keys(keys).build()
}

impl MongoClient {
    /// List the index models of a collection.
    ///
    /// A collection that does not exist has no indexes.
    pub async fn list_index_models(&self, collection: &str) -> MongoResult<Vec<IndexModel>> {
        let cursor = match self.collection_doc(collection).list_indexes(None).await {
            Ok(cursor) => cursor,
            Err(e) => {
                let err = MongoError::from(e);
                if err.is_namespace_not_found() {
                    debug!(collection = %collection, "Collection not found, no indexes");
                    return Ok(Vec::new());
                }
                return Err(err);
            }
        };

        let models: Vec<IndexModel> = cursor.try_collect().await.map_err(MongoError::from)?;
        Ok(models)
    }
}

#[async_trait]
impl IndexInspector for MongoClient {
    async fn indexed_fields(&self, collection: &str) -> InspectResult<HashSet<String>> {
        let models = self.list_index_models(collection).await?;
        let fields = indexed_field_names(&models);

        debug!(
            collection = %collection,
            indexes = models.len(),
            fields = fields.len(),
            "Listed indexes"
        );

        Ok(fields)
    }

    async fn create_index(&self, collection: &str, field: &str) -> InspectResult<String> {
        let result = self
            .collection_doc(collection)
            .create_index(single_field_index(field), None)
            .await
            .map_err(MongoError::from)?;

        Ok(result.index_name)
    }

    async fn collection_stats(&self, collection: &str) -> InspectResult<Option<Document>> {
        match self.run_command(doc! { "collStats": collection }).await {
            Ok(stats) => Ok(Some(stats)),
            Err(err) if err.is_namespace_not_found() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
