use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, trace};

use docmapper_core::{
    driver::{Driver, DriverBuilder},
    error::{MapperError, MapperResult},
    identifier::Identifier,
    translate::StorageQuery,
};

use crate::config::MongoDbConfig;

/// Driver backed by a MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoDbDriver {
    client: Client,
    database: String,
}

impl MongoDbDriver {
    /// Wraps an existing client, using `database` for every collection.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    /// Creates a [`MongoDbDriverBuilder`] for a connection string and database.
    pub fn builder(dsn: &str, database: &str) -> MongoDbDriverBuilder {
        MongoDbDriverBuilder::new(dsn, database)
    }

    /// The name of the database in use.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection)
    }
}

fn find_options(query: &StorageQuery) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = query.limit {
        options.limit = Some(limit as i64);
    }
    if query.offset > 0 {
        options.skip = Some(query.offset as u64);
    }
    if !query.sort.is_empty() {
        options.sort = Some(query.sort_document());
    }

    options
}

#[async_trait]
impl Driver for MongoDbDriver {
    async fn find(&self, collection: &str, query: &StorageQuery) -> MapperResult<Vec<Document>> {
        trace!("Finding in {} with {}", collection, query.selector);

        self.get_collection(collection)
            .find(query.selector.clone())
            .with_options(find_options(query))
            .await
            .map_err(|e| MapperError::storage(format!("find in {collection}"), e))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| MapperError::storage(format!("read cursor of {collection}"), e))
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<Identifier> {
        let result = self
            .get_collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| MapperError::storage(format!("insert into {collection}"), e))?;

        match result.inserted_id {
            Bson::ObjectId(id) => {
                debug!("Inserted {} into {}", id, collection);
                Ok(Identifier::from(id))
            },
            other => Err(MapperError::Serialization(format!(
                "{collection} returned a non object id key {other}"
            ))),
        }
    }

    async fn update(&self, collection: &str, selector: &Document, changes: Document) -> MapperResult<u64> {
        let result = self
            .get_collection(collection)
            .update_many(selector.clone(), doc! { "$set": changes })
            .await
            .map_err(|e| MapperError::storage(format!("update {collection}"), e))?;

        debug!("Matched {} documents in {}", result.matched_count, collection);
        Ok(result.matched_count)
    }

    async fn remove(&self, collection: &str, selector: &Document) -> MapperResult<u64> {
        let result = self
            .get_collection(collection)
            .delete_many(selector.clone())
            .await
            .map_err(|e| MapperError::storage(format!("remove from {collection}"), e))?;

        Ok(result.deleted_count)
    }

    async fn drop_collection(&self, collection: &str) -> MapperResult<()> {
        self.get_collection(collection)
            .drop()
            .await
            .map_err(|e| MapperError::storage(format!("drop {collection}"), e))
    }

    async fn list_collections(&self) -> MapperResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(|e| MapperError::storage(format!("list collections of {}", self.database), e))
    }

    async fn shutdown(self) -> MapperResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Builds a [`MongoDbDriver`] from a connection string.
#[derive(Debug, Clone)]
pub struct MongoDbDriverBuilder {
    config: MongoDbConfig,
}

impl MongoDbDriverBuilder {
    /// Creates a builder for a connection string and database.
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            config: MongoDbConfig::new(dsn, database),
        }
    }

    /// Name reported to the server in the connection handshake.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.config.app_name = Some(app_name.into());
        self
    }

    /// The settings the driver will be built from.
    pub fn config(&self) -> &MongoDbConfig {
        &self.config
    }
}

impl From<MongoDbConfig> for MongoDbDriverBuilder {
    fn from(config: MongoDbConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverBuilder for MongoDbDriverBuilder {
    type Driver = MongoDbDriver;

    async fn build(self) -> MapperResult<Self::Driver> {
        let MongoDbConfig { dsn, database, app_name } = self.config;

        let mut options = ClientOptions::parse(&dsn)
            .await
            .map_err(|e| MapperError::storage("parse connection string", e))?;
        if app_name.is_some() {
            options.app_name = app_name;
        }

        let client = Client::with_options(options).map_err(|e| MapperError::storage("connect", e))?;
        debug!("Connected to MongoDB database {}", database);

        Ok(MongoDbDriver::new(client, database))
    }
}

#[cfg(test)]
mod tests {
    use docmapper_core::query::SortDirection;

    use super::*;

    #[test]
    fn find_options_carry_paging_and_sort() {
        let query = StorageQuery {
            sort: vec![("num_spots".to_string(), SortDirection::Desc)],
            limit: Some(10),
            offset: 20,
            ..StorageQuery::default()
        };

        let options = find_options(&query);
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.skip, Some(20));
        assert_eq!(options.sort, Some(doc! { "num_spots": -1 }));
    }

    #[test]
    fn unpaged_queries_leave_options_unset() {
        let options = find_options(&StorageQuery::default());

        assert_eq!(options.limit, None);
        assert_eq!(options.skip, None);
        assert_eq!(options.sort, None);
    }

    #[test]
    fn builder_collects_app_name() {
        let builder = MongoDbDriver::builder("mongodb://localhost:27017", "zoo").app_name("keeper");

        assert_eq!(builder.config().app_name.as_deref(), Some("keeper"));
        assert_eq!(builder.config().database, "zoo");
    }
}
