//! The adapter maps resources to driver operations.
//!
//! [`Adapter`] dumps resources through the codecs, translates queries into storage
//! selectors and hydrates documents back into [`Resource`]s. Every operation
//! completes before it returns; results are fully materialised.
//!
//! # Example
//!
//! ```ignore
//! let adapter = Adapter::new(registry.clone(), MemoryDriver::new());
//!
//! let mut blue = Resource::new(&registry, "Heffalump")?.with("num_spots", 5)?;
//! adapter.create(&mut blue).await?;
//!
//! let spotted = adapter
//!     .read("Heffalump", &Query::filtered([Filter::gt("num_spots", 2), Filter::ne("num_spots", 3)]))
//!     .await?;
//! ```

use bson::Document;
use tracing::{debug, trace};

use crate::{
    association::reference_candidates,
    condition::{Condition, Operator},
    driver::Driver,
    error::{MapperError, MapperResult},
    identifier::Identifier,
    model::{AssociationKind, KEY_FIELD, Model},
    query::{Link, Query},
    registry::Registry,
    resource::{Persistable, Resource, StorageIdentity, load_attributes},
    translate::{StorageQuery, Translator},
    value::Value,
};

/// Selector matching one document by key.
pub(crate) fn key_selector(id: Identifier) -> Document {
    let mut selector = Document::new();
    selector.insert(KEY_FIELD, id);
    selector
}

/// Maps resources of a registry onto a driver.
#[derive(Debug, Clone)]
pub struct Adapter<D> {
    registry: Registry,
    driver: D,
}

impl<D: Driver> Adapter<D> {
    /// Creates an adapter over `driver` for the models of `registry`.
    pub fn new(registry: Registry, driver: D) -> Self {
        Adapter { registry, driver }
    }

    /// The registry whose models this adapter maps.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Consumes the adapter, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Looks up a root model by name.
    pub(crate) fn root(&self, model: &str) -> MapperResult<&Model> {
        let model = self.registry.model_by_name(model)?;

        if model.is_embedded() {
            return Err(MapperError::Definition(format!(
                "{} is embedded and has no collection",
                model.name()
            )));
        }

        Ok(model)
    }

    fn collection<'m>(model: &'m Model) -> MapperResult<&'m str> {
        model
            .collection()
            .ok_or_else(|| MapperError::Definition(format!("{} has no collection", model.name())))
    }

    fn ensure_registry(&self, resource: &Resource) -> MapperResult<()> {
        if resource.attributes().registry().same_as(&self.registry) {
            Ok(())
        } else {
            Err(MapperError::Validation(format!(
                "{} resource belongs to another registry",
                resource.model().name()
            )))
        }
    }

    /// Runs a translated query and hydrates the documents.
    pub(crate) async fn fetch(&self, model: &Model, query: &StorageQuery) -> MapperResult<Vec<Resource>> {
        let collection = Self::collection(model)?;
        trace!("Finding {} in {} with {}", model.name(), collection, query.selector);

        let documents = self.driver.find(collection, query).await?;

        documents
            .iter()
            .map(|document| Resource::load(&self.registry, model.id(), document))
            .collect()
    }

    /// Inserts a new resource and returns its identifier. A key set beforehand is
    /// kept, otherwise one is generated.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] if the resource is already persisted or
    /// cannot be dumped, and [`MapperError::Storage`] for driver failures.
    pub async fn create(&self, resource: &mut Resource) -> MapperResult<Identifier> {
        self.ensure_registry(resource)?;
        if resource.is_persisted() {
            return Err(MapperError::Validation(format!(
                "{} {} is already persisted",
                resource.model().name(),
                resource.id().map(|id| id.to_hex()).unwrap_or_default()
            )));
        }

        let mut attributes = resource.attributes().clone();
        attributes.assign_key(resource.id().unwrap_or_else(Identifier::new));
        let document = attributes.dump()?;

        debug!("Creating {} in {}", resource.model().name(), resource.collection());
        let id = self.driver.insert(resource.collection(), document).await?;

        resource.mark_persisted(id);
        Ok(id)
    }

    /// Reads resources of `model` matching `query`. Links are resolved into local
    /// membership conditions first.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Translation`] for unknown properties, unknown
    /// associations and unsupported operators; nothing reaches the driver then.
    pub async fn read(&self, model: &str, query: &Query) -> MapperResult<Vec<Resource>> {
        let model = self.root(model)?;
        let links = self.resolve_links(model, &query.links).await?;
        let storage = Translator::new(&self.registry, model).translate_with(query, links)?;

        self.fetch(model, &storage).await
    }

    /// The first resource matching `query`, if any.
    pub async fn first(&self, model: &str, query: &Query) -> MapperResult<Option<Resource>> {
        let query = Query {
            limit: Some(1),
            ..query.clone()
        };

        Ok(self.read(model, &query).await?.into_iter().next())
    }

    /// Reads every resource of `model`.
    pub async fn all(&self, model: &str) -> MapperResult<Vec<Resource>> {
        self.read(model, &Query::new()).await
    }

    /// Loads one resource by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::NotFound`] when no document has that identifier.
    pub async fn get(&self, model: &str, id: Identifier) -> MapperResult<Resource> {
        let model = self.root(model)?;
        let query = StorageQuery {
            limit: Some(1),
            ..StorageQuery::matching(key_selector(id))
        };

        self.fetch(model, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MapperError::not_found(model.name(), id))
    }

    fn persisted_id(&self, resource: &Resource) -> MapperResult<Identifier> {
        self.ensure_registry(resource)?;

        match (resource.is_persisted(), resource.id()) {
            (true, Some(id)) => Ok(id),
            _ => Err(MapperError::Validation(format!(
                "{} must be created before it is updated",
                resource.model().name()
            ))),
        }
    }

    /// Assigns `changes` and writes every changed attribute of a persisted resource.
    /// The resource is left untouched when any change is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] for new resources and rejected values, and
    /// [`MapperError::NotFound`] when the stored document is gone.
    pub async fn update<K, V>(&self, resource: &mut Resource, changes: impl IntoIterator<Item = (K, V)>) -> MapperResult<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.persisted_id(resource)?;

        let mut staged = resource.clone();
        for (name, value) in changes {
            staged.set(name.as_ref(), value)?;
        }
        *resource = staged;

        self.write_changes(resource).await
    }

    async fn write_changes(&self, resource: &mut Resource) -> MapperResult<()> {
        let id = self.persisted_id(resource)?;

        if !resource.is_dirty() {
            trace!("{} {} has no changes to write", resource.model().name(), id);
            return Ok(());
        }

        let changes = resource.attributes().dump_changes()?;
        debug!("Updating {} {} fields {:?}", resource.model().name(), id, resource.changed());

        let matched = self
            .driver
            .update(resource.collection(), &key_selector(id), changes)
            .await?;
        if matched == 0 {
            return Err(MapperError::not_found(resource.model().name(), id));
        }

        resource.mark_persisted(id);
        Ok(())
    }

    /// Creates a new resource or writes the changes of a persisted one.
    pub async fn save(&self, resource: &mut Resource) -> MapperResult<()> {
        if resource.is_new() {
            self.create(resource).await.map(|_| ())
        } else {
            self.write_changes(resource).await
        }
    }

    /// Removes a resource. Returns whether a document was removed; new resources are
    /// never removed. The resource counts as new afterwards.
    pub async fn delete(&self, resource: &mut Resource) -> MapperResult<bool> {
        self.ensure_registry(resource)?;

        let id = match (resource.is_persisted(), resource.id()) {
            (true, Some(id)) => id,
            _ => return Ok(false),
        };

        debug!("Deleting {} {}", resource.model().name(), id);
        let removed = self
            .driver
            .remove(resource.collection(), &key_selector(id))
            .await?;

        resource.mark_deleted();
        Ok(removed > 0)
    }

    /// Replaces a resource's attributes with its stored state.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::NotFound`] when the stored document is gone.
    pub async fn reload(&self, resource: &mut Resource) -> MapperResult<()> {
        let id = resource
            .id()
            .ok_or_else(|| MapperError::Validation(format!("{} has no identifier", resource.model().name())))?;
        let model = resource.model().id();

        let documents = self
            .driver
            .find(resource.collection(), &StorageQuery {
                limit: Some(1),
                ..StorageQuery::matching(key_selector(id))
            })
            .await?;
        let document = documents
            .first()
            .ok_or_else(|| MapperError::not_found(resource.model().name(), id))?;

        let attributes = load_attributes(&self.registry, model, document)?;
        resource.replace_attributes(attributes);
        Ok(())
    }

    /// Drops the collection of a root model. Dropping a missing collection succeeds.
    pub async fn drop_collection(&self, model: &str) -> MapperResult<()> {
        let model = self.root(model)?;
        let collection = Self::collection(model)?;

        debug!("Dropping collection {}", collection);
        self.driver.drop_collection(collection).await
    }

    /// Turns links into membership conditions on the queried model.
    async fn resolve_links(&self, model: &Model, links: &[Link]) -> MapperResult<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(links.len());

        for link in links {
            let association = model.association(&link.association).ok_or_else(|| {
                MapperError::Translation(format!("{} has no association {}", model.name(), link.association))
            })?;
            let target = self.registry.model(association.target());
            let related_query = StorageQuery::matching(Translator::new(&self.registry, target).selector(&link.criteria)?);
            let related = self.fetch(target, &related_query).await?;

            let condition = match association.kind() {
                AssociationKind::BelongsTo => {
                    let key = model
                        .property(association.key())
                        .ok_or_else(|| MapperError::Definition(format!("missing key {}", association.key())))?;
                    let ids = related.iter().filter_map(Resource::id);

                    Condition::new(key, Operator::In, reference_candidates(ids))?
                },
                AssociationKind::HasMany => {
                    let mut ids = Vec::new();
                    for child in &related {
                        if let Some(id) = child.get(association.key())?.as_identifier() {
                            if !ids.contains(&id) {
                                ids.push(id);
                            }
                        }
                    }

                    Condition::new(model.key_property(), Operator::In, Value::array(ids))?
                },
            };

            trace!("Resolved link {} to {:?}", link.association, condition);
            conditions.push(condition);
        }

        Ok(conditions)
    }
}
