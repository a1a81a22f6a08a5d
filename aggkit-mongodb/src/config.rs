//! MongoDB connection configuration.
//!
//! # Environment Variables
//!
//! - `AGGKIT_MONGODB_URI` - Connection string (default: `mongodb://localhost:27017`)
//! - `AGGKIT_MONGODB_DATABASE` - Database name (required)
//! - `AGGKIT_MONGODB_APP_NAME` - Application name shown in server logs
//! - `AGGKIT_MONGODB_MAX_POOL_SIZE` - Maximum connection pool size

use std::env;
use std::time::Duration;

use mongodb::options::ClientOptions;

use crate::error::{MongoError, MongoResult};

/// Default connection string.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Environment variable holding the connection string.
pub const URI_ENV: &str = "AGGKIT_MONGODB_URI";
/// Environment variable holding the database name.
pub const DATABASE_ENV: &str = "AGGKIT_MONGODB_DATABASE";
/// Environment variable holding the application name.
pub const APP_NAME_ENV: &str = "AGGKIT_MONGODB_APP_NAME";
/// Environment variable holding the maximum pool size.
pub const MAX_POOL_SIZE_ENV: &str = "AGGKIT_MONGODB_MAX_POOL_SIZE";

/// MongoDB connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// MongoDB connection URI.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Application name (shown in server logs).
    pub app_name: Option<String>,
    /// Minimum connection pool size.
    pub min_pool_size: Option<u32>,
    /// Maximum connection pool size.
    pub max_pool_size: Option<u32>,
    /// Connection timeout.
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout.
    pub server_selection_timeout: Option<Duration>,
    /// Direct connection (bypass replica set discovery).
    pub direct_connection: Option<bool>,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: String::new(),
            app_name: Some("aggkit".to_string()),
            min_pool_size: None,
            max_pool_size: Some(10),
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            direct_connection: None,
        }
    }
}

impl MongoConfig {
    /// Create a new configuration from a MongoDB URI.
    pub fn from_uri(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::new()
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Read the configuration through a variable lookup function.
    pub fn from_vars<F>(lookup: F) -> MongoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = MongoConfig::builder();

        if let Some(uri) = lookup(URI_ENV) {
            builder = builder.uri(uri);
        }
        if let Some(database) = lookup(DATABASE_ENV) {
            builder = builder.database(database);
        }
        if let Some(app_name) = lookup(APP_NAME_ENV) {
            builder = builder.app_name(app_name);
        }
        if let Some(size) = lookup(MAX_POOL_SIZE_ENV) {
            let size = size.trim().parse::<u32>().map_err(|_| {
                MongoError::config(format!("invalid {}: {:?}", MAX_POOL_SIZE_ENV, size))
            })?;
            builder = builder.max_pool_size(size);
        }

        builder.build()
    }

    /// Convert to MongoDB ClientOptions.
    pub async fn to_client_options(&self) -> MongoResult<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| MongoError::config(format!("failed to parse URI: {}", e)))?;

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }

        if let Some(min_pool) = self.min_pool_size {
            options.min_pool_size = Some(min_pool);
        }

        if let Some(max_pool) = self.max_pool_size {
            options.max_pool_size = Some(max_pool);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            options.connect_timeout = Some(connect_timeout);
        }

        if let Some(selection_timeout) = self.server_selection_timeout {
            options.server_selection_timeout = Some(selection_timeout);
        }

        if let Some(direct) = self.direct_connection {
            options.direct_connection = Some(direct);
        }

        Ok(options)
    }
}

/// Builder for MongoDB configuration.
#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
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

    /// Set the minimum pool size.
    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the server selection timeout.
    pub fn server_selection_timeout(mut self, duration: Duration) -> Self {
        self.server_selection_timeout = Some(duration);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> MongoResult<MongoConfig> {
        let database = self
            .database
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| MongoError::config("database name is required"))?;

        let defaults = MongoConfig::default();

        Ok(MongoConfig {
            uri: self.uri.unwrap_or(defaults.uri),
            database,
            app_name: self.app_name.or(defaults.app_name),
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size.or(defaults.max_pool_size),
            connect_timeout: self.connect_timeout.or(defaults.connect_timeout),
            server_selection_timeout: self
                .server_selection_timeout
                .or(defaults.server_selection_timeout),
            direct_connection: self.direct_connection,
        })
    }
}
