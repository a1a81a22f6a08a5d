//! MongoDB client wrapper with built-in connection pooling.

use std::sync::Arc;

use aggkit_core::AggregatePlan;
use bson::{Document, doc};
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::error::{MongoError, MongoResult};

/// A MongoDB client with connection pooling.
///
/// The driver pools connections internally; this wrapper pins one database
/// and adds the operations aggkit needs.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl MongoClient {
    /// Create a new client from configuration.
    pub async fn new(config: MongoConfig) -> MongoResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| MongoError::connection(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            uri = %config.uri,
            database = %config.database,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
        })
    }

    /// Create a client from `AGGKIT_MONGODB_*` environment variables.
    pub async fn from_env() -> MongoResult<Self> {
        Self::new(MongoConfig::from_env()?).await
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// Get a collection with BSON documents.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the underlying MongoDB client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// Check if the client is healthy by pinging the server.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }

    /// Run a database command.
    pub async fn run_command(&self, command: Document) -> MongoResult<Document> {
        let result = self
            .database
            .run_command(command, None)
            .await
            .map_err(MongoError::from)?;
        Ok(result)
    }

    /// Run a built pipeline against its first selected collection.
    pub async fn aggregate(&self, plan: &AggregatePlan) -> MongoResult<Vec<Document>> {
        let collection = plan
            .primary_collection()
            .ok_or_else(|| MongoError::query("aggregate plan has no collection"))?;

        debug!(
            collection = %collection,
            stages = plan.pipeline.len(),
            "Running aggregation"
        );

        let cursor = self
            .collection_doc(collection)
            .aggregate(plan.to_documents(), None)
            .await
            .map_err(MongoError::from)?;

        let docs: Vec<Document> = cursor.try_collect().await.map_err(MongoError::from)?;
        Ok(docs)
    }
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("database", &self.config.database)
            .finish_non_exhaustive()
    }
}

/// Builder for MongoClient.
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<std::time::Duration>,
    direct_connection: Option<bool>,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: std::time::Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Resolve the configuration without connecting.
    pub fn config(self) -> MongoResult<MongoConfig> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }

        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }

        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }

        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }

        if let Some(timeout) = self.connect_timeout {
            config_builder = config_builder.connect_timeout(timeout);
        }

        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        config_builder.build()
    }

    /// Build the client.
    pub async fn build(self) -> MongoResult<MongoClient> {
        MongoClient::new(self.config()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_client_builder_config() {
        let config = MongoClientBuilder::new()
            .uri("mongodb://localhost:27017")
            .database("analytics")
            .max_pool_size(20)
            .connect_timeout(Duration::from_secs(3))
            .config()
            .unwrap();

        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "analytics");
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_client_builder_requires_database() {
        assert!(MongoClientBuilder::new().config().is_err());
    }

    #[tokio::test]
    async fn test_client_creation_is_lazy() {
        // The driver connects on first use, so creating a client needs no server.
        let client = MongoClient::builder()
            .database("analytics")
            .build()
            .await
            .unwrap();

        assert_eq!(client.config().database, "analytics");
        assert_eq!(client.database().name(), "analytics");
    }

    #[tokio::test]
    async fn test_aggregate_requires_collection() {
        let client = MongoClient::builder()
            .database("analytics")
            .build()
            .await
            .unwrap();

        let err = client.aggregate(&AggregatePlan::default()).await.unwrap_err();
        assert!(matches!(err, MongoError::Query(_)));
    }
}
