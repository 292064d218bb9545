//! In-memory driver implementation.
//!
//! Collections are kept as insertion-ordered vectors of BSON documents behind an
//! async-aware read-write lock. Queries scan every document of a collection.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use tracing::{debug, trace};

use docmapper_core::{
    driver::{Driver, DriverBuilder},
    error::{MapperError, MapperResult},
    identifier::Identifier,
    model::KEY_FIELD,
    selector,
    translate::StorageQuery,
};

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory storage driver.
///
/// `MemoryDriver` is cloneable; clones share the same underlying collections, so it
/// can be handed to several adapters or async tasks.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::MemoryDriver;
/// use docmapper_core::{driver::Driver, translate::StorageQuery};
/// use bson::doc;
///
/// let driver = MemoryDriver::new();
/// driver.insert("heffalumps", doc! { "color": "blue" }).await?;
///
/// let blue = driver
///     .find("heffalumps", &StorageQuery::matching(doc! { "color": "blue" }))
///     .await?;
/// assert_eq!(blue.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryDriver {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryDriver {
    /// Creates a driver with no collections.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a [`MemoryDriverBuilder`].
    pub fn builder() -> MemoryDriverBuilder {
        MemoryDriverBuilder::default()
    }
}

fn document_id(document: &Document) -> Option<ObjectId> {
    match document.get(KEY_FIELD) {
        Some(Bson::ObjectId(id)) => Some(*id),
        _ => None,
    }
}

/// Evaluates `selector` against every document before anything is written, so a
/// malformed selector leaves the collection untouched.
fn matching(documents: &[Document], selector: &Document) -> MapperResult<Vec<bool>> {
    documents
        .iter()
        .map(|document| selector::matches(document, selector))
        .collect()
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn find(&self, collection: &str, query: &StorageQuery) -> MapperResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(documents) = store.get(collection) else {
            trace!("Collection {} is empty", collection);
            return Ok(Vec::new());
        };

        let mut matched = selector::filter(documents, &query.selector)?;
        selector::sort(&mut matched, &query.sort);

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn insert(&self, collection: &str, mut document: Document) -> MapperResult<Identifier> {
        let id = match document.get(KEY_FIELD) {
            None | Some(Bson::Null) => {
                let id = ObjectId::new();
                document.insert(KEY_FIELD, id);
                id
            },
            Some(Bson::ObjectId(id)) => *id,
            Some(other) => {
                return Err(MapperError::storage(
                    format!("insert into {collection}"),
                    format!("{KEY_FIELD} must be an object id, got {other}"),
                ));
            },
        };

        let mut store = self.store.write().await;
        let documents = store.entry(collection.to_string()).or_default();

        if documents.iter().any(|existing| document_id(existing) == Some(id)) {
            return Err(MapperError::storage(
                format!("insert into {collection}"),
                format!("duplicate key {id}"),
            ));
        }

        debug!("Inserting {} into {}", id, collection);
        documents.push(document);

        Ok(Identifier::from(id))
    }

    async fn update(&self, collection: &str, selector: &Document, changes: Document) -> MapperResult<u64> {
        if changes.contains_key(KEY_FIELD) {
            return Err(MapperError::storage(
                format!("update {collection}"),
                format!("{KEY_FIELD} cannot be changed"),
            ));
        }

        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(0);
        };

        let hits = matching(documents, selector)?;
        for (document, _) in documents.iter_mut().zip(&hits).filter(|(_, hit)| **hit) {
            for (field, value) in &changes {
                document.insert(field.clone(), value.clone());
            }
        }

        let matched = hits.iter().filter(|hit| **hit).count() as u64;
        debug!("Updated {} documents in {}", matched, collection);
        Ok(matched)
    }

    async fn remove(&self, collection: &str, selector: &Document) -> MapperResult<u64> {
        let mut store = self.store.write().await;
        let Some(documents) = store.get_mut(collection) else {
            return Ok(0);
        };

        let mut hits = matching(documents, selector)?.into_iter();
        let before = documents.len();
        documents.retain(|_| !hits.next().unwrap_or(false));

        let removed = (before - documents.len()) as u64;
        debug!("Removed {} documents from {}", removed, collection);
        Ok(removed)
    }

    async fn drop_collection(&self, collection: &str) -> MapperResult<()> {
        if self.store.write().await.remove(collection).is_some() {
            debug!("Dropped collection {}", collection);
        }

        Ok(())
    }

    async fn list_collections(&self) -> MapperResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for [`MemoryDriver`] instances.
#[derive(Default)]
pub struct MemoryDriverBuilder;

#[async_trait]
impl DriverBuilder for MemoryDriverBuilder {
    type Driver = MemoryDriver;

    async fn build(self) -> MapperResult<Self::Driver> {
        Ok(MemoryDriver::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docmapper_core::query::SortDirection;

    use super::*;

    async fn seeded() -> MemoryDriver {
        let driver = MemoryDriver::builder().build().await.unwrap();

        for (color, spots) in [("red", 2), ("blue", 3), ("red", 5), ("green", 1)] {
            driver
                .insert("heffalumps", doc! { "color": color, "num_spots": spots })
                .await
                .unwrap();
        }

        driver
    }

    #[tokio::test]
    async fn insert_generates_missing_keys() {
        let driver = MemoryDriver::new();
        let id = driver.insert("heffalumps", doc! { "color": "red" }).await.unwrap();

        let found = driver.find("heffalumps", &StorageQuery::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_object_id(KEY_FIELD).unwrap(), id.as_object_id());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_keys() {
        let driver = MemoryDriver::new();
        let id = ObjectId::new();

        driver.insert("heffalumps", doc! { "_id": id }).await.unwrap();
        let err = driver.insert("heffalumps", doc! { "_id": id }).await.unwrap_err();

        assert!(matches!(err, MapperError::Storage { .. }));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_pages() {
        let driver = seeded().await;
        let query = StorageQuery {
            sort: vec![("num_spots".to_string(), SortDirection::Desc)],
            limit: Some(2),
            offset: 1,
            ..StorageQuery::matching(doc! { "num_spots": { "$gt": 1 } })
        };

        let found = driver.find("heffalumps", &query).await.unwrap();
        let spots = found
            .iter()
            .map(|d| d.get_i32("num_spots").unwrap())
            .collect::<Vec<_>>();

        assert_eq!(spots, [3, 2]);
    }

    #[tokio::test]
    async fn missing_collections_are_empty() {
        let driver = MemoryDriver::new();

        assert!(driver.find("nothing", &StorageQuery::default()).await.unwrap().is_empty());
        assert_eq!(driver.update("nothing", &doc! {}, doc! { "a": 1 }).await.unwrap(), 0);
        assert_eq!(driver.remove("nothing", &doc! {}).await.unwrap(), 0);
        driver.drop_collection("nothing").await.unwrap();
    }

    #[tokio::test]
    async fn update_sets_fields_on_matches() {
        let driver = seeded().await;

        let matched = driver
            .update("heffalumps", &doc! { "color": "red" }, doc! { "color": "pink" })
            .await
            .unwrap();
        assert_eq!(matched, 2);

        let pink = driver
            .find("heffalumps", &StorageQuery::matching(doc! { "color": "pink" }))
            .await
            .unwrap();
        assert_eq!(pink.len(), 2);
        assert!(pink.iter().all(|d| d.contains_key("num_spots")));
    }

    #[tokio::test]
    async fn update_refuses_key_changes() {
        let driver = seeded().await;
        let err = driver
            .update("heffalumps", &doc! {}, doc! { "_id": ObjectId::new() })
            .await
            .unwrap_err();

        assert!(matches!(err, MapperError::Storage { .. }));
    }

    #[tokio::test]
    async fn remove_and_drop() {
        let driver = seeded().await;

        assert_eq!(driver.remove("heffalumps", &doc! { "color": "red" }).await.unwrap(), 2);
        assert_eq!(driver.find("heffalumps", &StorageQuery::default()).await.unwrap().len(), 2);
        assert_eq!(driver.list_collections().await.unwrap(), ["heffalumps"]);

        driver.drop_collection("heffalumps").await.unwrap();
        assert!(driver.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_collections() {
        let driver = MemoryDriver::new();
        let other = driver.clone();

        driver.insert("heffalumps", doc! { "color": "red" }).await.unwrap();
        assert_eq!(other.find("heffalumps", &StorageQuery::default()).await.unwrap().len(), 1);
    }
}
