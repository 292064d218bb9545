//! Storage driver abstraction.
//!
//! A [`Driver`] executes storage-level operations on named collections of BSON
//! documents. It knows nothing about models: selectors arrive already translated and
//! documents already dumped. The [`Adapter`](crate::adapter::Adapter) sits on top and
//! does the mapping.
//!
//! # Traits
//!
//! - [`Driver`]: the async storage contract
//! - [`DriverBuilder`]: factory trait for creating drivers
//!
//! # Examples
//!
//! ```ignore
//! use docmapper::driver::Driver;
//! use bson::doc;
//!
//! let id = driver.insert("heffalumps", doc! { "color": "red" }).await?;
//! let found = driver
//!     .find("heffalumps", &StorageQuery::matching(doc! { "color": "red" }))
//!     .await?;
//! ```

use std::{fmt::Debug, sync::Arc};

use async_trait::async_trait;
use bson::Document;

use crate::{error::MapperResult, identifier::Identifier, translate::StorageQuery};

/// Abstract interface for document storage.
///
/// # Thread Safety
///
/// Implementations must be usable from many async tasks at once.
///
/// # Error Handling
///
/// Storage failures are reported as [`MapperError::Storage`](crate::error::MapperError::Storage)
/// with the driver's own error kept as the source. Drivers never retry.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Returns the documents matching `query.selector`, sorted by `query.sort`, with
    /// `query.offset` skipped and at most `query.limit` returned. A missing collection
    /// is empty.
    async fn find(&self, collection: &str, query: &StorageQuery) -> MapperResult<Vec<Document>>;

    /// Inserts a document and returns its `_id`, which is generated when missing.
    async fn insert(&self, collection: &str, document: Document) -> MapperResult<Identifier>;

    /// Sets the fields of `changes` on every document matching `selector` and returns
    /// the number of matched documents.
    async fn update(&self, collection: &str, selector: &Document, changes: Document) -> MapperResult<u64>;

    /// Removes every document matching `selector` and returns how many were removed.
    async fn remove(&self, collection: &str, selector: &Document) -> MapperResult<u64>;

    /// Drops a collection. Dropping a missing collection is not an error.
    async fn drop_collection(&self, collection: &str) -> MapperResult<()>;

    async fn list_collections(&self) -> MapperResult<Vec<String>>;

    /// Releases the driver's resources.
    async fn shutdown(self) -> MapperResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<D> Driver for &D
where
    D: Driver,
{
    async fn find(&self, collection: &str, query: &StorageQuery) -> MapperResult<Vec<Document>> {
        (*self).find(collection, query).await
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<Identifier> {
        (*self).insert(collection, document).await
    }

    async fn update(&self, collection: &str, selector: &Document, changes: Document) -> MapperResult<u64> {
        (*self)
            .update(collection, selector, changes)
            .await
    }

    async fn remove(&self, collection: &str, selector: &Document) -> MapperResult<u64> {
        (*self).remove(collection, selector).await
    }

    async fn drop_collection(&self, collection: &str) -> MapperResult<()> {
        (*self).drop_collection(collection).await
    }

    async fn list_collections(&self) -> MapperResult<Vec<String>> {
        (*self).list_collections().await
    }
}

#[async_trait]
impl<D> Driver for Arc<D>
where
    D: Driver,
{
    async fn find(&self, collection: &str, query: &StorageQuery) -> MapperResult<Vec<Document>> {
        (**self).find(collection, query).await
    }

    async fn insert(&self, collection: &str, document: Document) -> MapperResult<Identifier> {
        (**self).insert(collection, document).await
    }

    async fn update(&self, collection: &str, selector: &Document, changes: Document) -> MapperResult<u64> {
        (**self)
            .update(collection, selector, changes)
            .await
    }

    async fn remove(&self, collection: &str, selector: &Document) -> MapperResult<u64> {
        (**self).remove(collection, selector).await
    }

    async fn drop_collection(&self, collection: &str) -> MapperResult<()> {
        (**self).drop_collection(collection).await
    }

    async fn list_collections(&self) -> MapperResult<Vec<String>> {
        (**self).list_collections().await
    }
}

#[async_trait]
pub trait DriverBuilder {
    type Driver: Driver;

    async fn build(self) -> MapperResult<Self::Driver>;
}
