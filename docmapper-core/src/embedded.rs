//! Embedded resources and one-to-many collections of them.
//!
//! Embedded resources have no collection of their own. Their identity is the key
//! identifier stored under `_id` inside the nested document; it is generated when a
//! resource is built and when a stored sub-document lacks one.
//!
//! # Example
//!
//! ```ignore
//! let keepers = zoo.embedded_many_mut("keepers")?;
//!
//! let mut keeper = keepers.build()?;
//! keeper.set("name", "Alex")?;
//! keepers.push(keeper)?;
//!
//! let seniors = keepers.all(&[Filter::gte("years", 10)])?;
//! ```

use std::{collections::HashSet, fmt};

use bson::{Bson, Document};
use tracing::trace;

use crate::{
    error::{MapperError, MapperResult},
    identifier::Identifier,
    model::{Embedment, ModelId},
    query::Criterion,
    registry::Registry,
    resource::{AttributeSet, Persistable},
    selector,
    translate::Translator,
    value::Value,
};

/// A resource of an embedded model, living inside a parent document.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedResource {
    attributes: AttributeSet,
}

impl EmbeddedResource {
    /// Builds a new resource of the named embedded model with a fresh identity.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Definition`] when the model is unknown or is a root model.
    pub fn new(registry: &Registry, model: &str) -> MapperResult<Self> {
        let model = registry.model_by_name(model)?.id();
        EmbeddedResource::of(registry, model)
    }

    /// Creates an empty embedded resource of `model` with a fresh identity.
    pub fn of(registry: &Registry, model: ModelId) -> MapperResult<Self> {
        let mut attributes = embedded_attributes(registry, model)?;
        attributes.assign_key(Identifier::new());

        Ok(EmbeddedResource { attributes })
    }

    /// Builds a resource from a map keyed by property names. An `id` entry keeps the
    /// given identity, otherwise one is generated.
    pub fn from_value(registry: &Registry, model: ModelId, value: &Value) -> MapperResult<Self> {
        let Value::Map(entries) = value else {
            return Err(MapperError::Validation(format!(
                "{} cannot be built from a {} value",
                registry.model(model).name(),
                value.kind_name()
            )));
        };

        let mut attributes = embedded_attributes(registry, model)?;
        attributes.apply(entries)?;
        if attributes.key().is_none() {
            attributes.assign_key(Identifier::new());
        }

        Ok(EmbeddedResource { attributes })
    }

    pub(crate) fn load(registry: &Registry, model: ModelId, document: &Document) -> MapperResult<Self> {
        let mut attributes = AttributeSet::load(registry.clone(), model, document)?;

        if attributes.key().is_none() {
            attributes.assign_key(Identifier::new());
            attributes.touch_key();
        }

        Ok(EmbeddedResource { attributes })
    }

    /// Builder-style [`Persistable::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> MapperResult<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// The identity of this resource within its parent.
    pub fn id(&self) -> Option<Identifier> {
        self.key()
    }
}

fn embedded_attributes(registry: &Registry, model: ModelId) -> MapperResult<AttributeSet> {
    let definition = registry.model(model);

    if !definition.is_embedded() {
        return Err(MapperError::Definition(format!(
            "{} is a root model, not an embedded one",
            definition.name()
        )));
    }

    AttributeSet::new(registry.clone(), model)
}

impl Persistable for EmbeddedResource {
    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }
}

/// The ordered resources of a one-to-many embedment.
///
/// Every mutation marks the collection dirty; changes persist when the parent is
/// saved.
#[derive(Clone)]
pub struct EmbeddedCollection {
    registry: Registry,
    embedment: String,
    model: ModelId,
    items: Vec<EmbeddedResource>,
    dirty: bool,
}

impl EmbeddedCollection {
    pub(crate) fn new(registry: Registry, embedment: &Embedment) -> Self {
        EmbeddedCollection {
            registry,
            embedment: embedment.name().to_string(),
            model: embedment.model(),
            items: Vec::new(),
            dirty: false,
        }
    }

    pub(crate) fn load(registry: Registry, embedment: &Embedment, items: &[Bson]) -> MapperResult<Self> {
        let resources = items
            .iter()
            .map(|item| match item {
                Bson::Document(document) => EmbeddedResource::load(&registry, embedment.model(), document),
                other => Err(MapperError::Serialization(format!(
                    "embedment {} holds a {:?} element",
                    embedment.name(),
                    other.element_type()
                ))),
            })
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(EmbeddedCollection {
            items: resources,
            ..EmbeddedCollection::new(registry, embedment)
        })
    }

    /// Builds a new, unattached resource of this collection's model.
    pub fn build(&self) -> MapperResult<EmbeddedResource> {
        EmbeddedResource::of(&self.registry, self.model)
    }

    fn check(&self, resource: &EmbeddedResource) -> MapperResult<Identifier> {
        let attributes = resource.attributes();

        if !attributes.registry().same_as(&self.registry) || attributes.model_id() != self.model {
            return Err(MapperError::Validation(format!(
                "embedment {} holds {} resources, not {}",
                self.embedment,
                self.registry.model(self.model).name(),
                attributes.model().name()
            )));
        }

        resource
            .id()
            .ok_or_else(|| MapperError::Validation(format!("resource in {} has no identity", self.embedment)))
    }

    fn duplicate(&self, id: Identifier) -> MapperError {
        MapperError::Validation(format!("embedment {} already holds {}", self.embedment, id))
    }

    /// Appends a resource.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] when the resource belongs to another model
    /// or its identity is already present.
    pub fn push(&mut self, resource: EmbeddedResource) -> MapperResult<()> {
        let id = self.check(&resource)?;
        if self.get(id).is_some() {
            return Err(self.duplicate(id));
        }

        self.items.push(resource);
        self.dirty = true;
        Ok(())
    }

    /// Replaces every resource. Identities absent from `resources` are discarded.
    pub fn replace(&mut self, resources: impl IntoIterator<Item = EmbeddedResource>) -> MapperResult<()> {
        let resources = resources.into_iter().collect::<Vec<_>>();
        let mut seen = HashSet::with_capacity(resources.len());

        for resource in &resources {
            let id = self.check(resource)?;
            if !seen.insert(id) {
                return Err(self.duplicate(id));
            }
        }

        self.items = resources;
        self.dirty = true;
        Ok(())
    }

    /// Removes every resource. Marks the collection dirty unless it was already empty.
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.items.clear();
            self.dirty = true;
        }
    }

    /// Removes and returns the resource with the given identity.
    pub fn remove(&mut self, id: Identifier) -> Option<EmbeddedResource> {
        let index = self.items.iter().position(|item| item.id() == Some(id))?;
        self.dirty = true;
        Some(self.items.remove(index))
    }

    /// Finds a resource by identity.
    pub fn get(&self, id: Identifier) -> Option<&EmbeddedResource> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Mutable access by identity. Changes made through it are tracked by the
    /// resource itself.
    pub fn get_mut(&mut self, id: Identifier) -> Option<&mut EmbeddedResource> {
        self.items.iter_mut().find(|item| item.id() == Some(id))
    }

    /// The first resource, if any.
    pub fn first(&self) -> Option<&EmbeddedResource> {
        self.items.first()
    }

    /// Iterates resources in order.
    pub fn iter(&self) -> std::slice::Iter<'_, EmbeddedResource> {
        self.items.iter()
    }

    /// Number of resources held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no resources.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resources matching all criteria, in collection order. Criteria are translated
    /// exactly as for a storage query and evaluated against each dumped resource.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Translation`] for unknown properties or unsupported
    /// operators.
    pub fn all(&self, criteria: &[Criterion]) -> MapperResult<Vec<&EmbeddedResource>> {
        let model = self.registry.model(self.model);
        let selector = Translator::new(&self.registry, model).selector(criteria)?;

        trace!("Filtering embedded collection {} with {}", self.embedment, selector);

        let mut matched = Vec::new();
        for item in &self.items {
            if selector::matches(&item.to_document()?, &selector)? {
                matched.push(item);
            }
        }

        Ok(matched)
    }

    /// Whether the collection or any of its resources changed since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.items.iter().any(|item| item.is_dirty())
    }

    pub(crate) fn clean(&mut self) {
        self.dirty = false;
        for item in &mut self.items {
            item.attributes_mut().clean();
        }
    }

    pub(crate) fn dump(&self) -> MapperResult<Bson> {
        self.items
            .iter()
            .map(|item| item.to_document().map(Bson::Document))
            .collect::<MapperResult<Vec<_>>>()
            .map(Bson::Array)
    }

    /// The resources as a sequence of maps, usable as a deep-equality operand.
    pub fn to_value(&self) -> Value {
        Value::Array(self.items.iter().map(|item| item.to_value()).collect())
    }
}

impl PartialEq for EmbeddedCollection {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl fmt::Debug for EmbeddedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<'a> IntoIterator for &'a EmbeddedCollection {
    type Item = &'a EmbeddedResource;
    type IntoIter = std::slice::Iter<'a, EmbeddedResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::{
        embedment::EmbedValue,
        model::{ModelBuilder, Property, PropertyType},
        query::Filter,
        resource::Resource,
    };

    fn registry() -> Registry {
        Registry::builder()
            .define(
                ModelBuilder::new("Zoo")
                    .property(Property::new("name", PropertyType::STRING))
                    .embeds_many("keepers", "Keeper")
                    .embeds_one("director", "Keeper"),
            )
            .define(
                ModelBuilder::embedded("Keeper")
                    .property(Property::new("name", PropertyType::STRING))
                    .property(Property::new("years", PropertyType::INTEGER)),
            )
            .build()
            .unwrap()
    }

    fn keeper(registry: &Registry, name: &str, years: i64) -> EmbeddedResource {
        EmbeddedResource::new(registry, "Keeper")
            .unwrap()
            .with("name", name)
            .unwrap()
            .with("years", years)
            .unwrap()
    }

    #[test]
    fn push_and_lookup_by_identity() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();
        let alex = keeper(&registry, "Alex", 3);
        let id = alex.id().unwrap();

        zoo.embedded_many_mut("keepers").unwrap().push(alex.clone()).unwrap();

        let keepers = zoo.embedded_many("keepers").unwrap();
        assert_eq!(keepers.len(), 1);
        assert_eq!(keepers.get(id), Some(&alex));
        assert!(zoo.is_dirty());

        let err = zoo.embedded_many_mut("keepers").unwrap().push(alex).unwrap_err();
        assert!(matches!(err, MapperError::Validation(_)));
    }

    #[test]
    fn replace_discards_absent_identities() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();
        let keepers = zoo.embedded_many_mut("keepers").unwrap();

        keepers
            .replace(vec![
                keeper(&registry, "Alex", 3),
                keeper(&registry, "Marty", 5),
                keeper(&registry, "Gloria", 8),
            ])
            .unwrap();
        let survivor = keeper(&registry, "Melman", 1);
        keepers.replace(vec![survivor.clone()]).unwrap();

        assert_eq!(keepers.len(), 1);
        assert_eq!(keepers.first(), Some(&survivor));
    }

    #[test]
    fn remove_and_get_mut_track_changes() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();
        let alex = keeper(&registry, "Alex", 3);
        let id = alex.id().unwrap();
        zoo.embedded_many_mut("keepers").unwrap().push(alex).unwrap();
        zoo.attributes_mut().clean();

        zoo.embedded_many_mut("keepers")
            .unwrap()
            .get_mut(id)
            .unwrap()
            .set("years", 4)
            .unwrap();
        assert_eq!(zoo.changed(), ["keepers"]);

        let removed = zoo.embedded_many_mut("keepers").unwrap().remove(id).unwrap();
        assert_eq!(removed.get("years").unwrap(), &Value::Integer(4));
        assert!(zoo.embedded_many("keepers").unwrap().is_empty());
    }

    #[test]
    fn all_supports_the_full_operator_set() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();
        zoo.embedded_many_mut("keepers")
            .unwrap()
            .replace(vec![
                keeper(&registry, "Alex", 3),
                keeper(&registry, "Marty", 5),
                keeper(&registry, "Gloria", 8),
            ])
            .unwrap();
        let keepers = zoo.embedded_many("keepers").unwrap();

        let names = |found: Vec<&EmbeddedResource>| {
            found
                .iter()
                .map(|k| k.get("name").unwrap().as_str().unwrap().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(keepers.all(&[Filter::gt("years", 3), Filter::ne("years", 5)]).unwrap()), ["Gloria"]);
        assert_eq!(names(keepers.all(&[Filter::regex_with_options("name", "^a|^m", "i")]).unwrap()), ["Alex", "Marty"]);
        assert_eq!(names(keepers.all(&[Filter::none_of("name", ["Alex"])]).unwrap()), ["Marty", "Gloria"]);
        assert_eq!(keepers.all(&[]).unwrap().len(), 3);

        let err = keepers.all(&[Filter::eq("salary", 1)]).unwrap_err();
        assert!(matches!(err, MapperError::Translation(_)));
    }

    #[test]
    fn cardinality_mismatches_are_rejected() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();

        let err = zoo
            .set_embedded("director", vec![keeper(&registry, "Alex", 3)])
            .unwrap_err();
        assert!(matches!(err, MapperError::EmbedmentCardinality { .. }));

        let err = zoo.set_embedded("keepers", keeper(&registry, "Alex", 3)).unwrap_err();
        assert!(matches!(err, MapperError::EmbedmentCardinality { .. }));

        let err = zoo.set("keepers", Value::map([("name", "Alex")])).unwrap_err();
        assert!(matches!(err, MapperError::EmbedmentCardinality { .. }));

        assert!(matches!(zoo.embedded("keepers"), Err(MapperError::EmbedmentCardinality { .. })));
        assert!(matches!(zoo.embedded_many("director"), Err(MapperError::EmbedmentCardinality { .. })));
    }

    #[test]
    fn one_to_one_set_and_clear() {
        let registry = registry();
        let mut zoo = Resource::new(&registry, "Zoo").unwrap();

        zoo.set_embedded("director", keeper(&registry, "Alex", 3)).unwrap();
        assert_eq!(
            zoo.embedded("director").unwrap().unwrap().get("name").unwrap(),
            &Value::from("Alex")
        );

        zoo.set_embedded("director", EmbedValue::Absent).unwrap();
        assert_eq!(zoo.embedded("director").unwrap(), None);
    }

    #[test]
    fn loading_generates_missing_identities() {
        let registry = registry();
        let model = registry.model_by_name("Zoo").unwrap().id();
        let id = Identifier::new();
        let document = doc! {
            "_id": id.as_object_id(),
            "keepers": [ { "name": "Alex", "years": 3 } ],
        };

        let zoo = Resource::load(&registry, model, &document).unwrap();
        let keepers = zoo.embedded_many("keepers").unwrap();

        assert!(keepers.first().unwrap().id().is_some());
        assert!(zoo.is_dirty());
        assert_eq!(zoo.embedded("director").unwrap(), None);
    }

    #[test]
    fn values_round_trip_through_from_value() {
        let registry = registry();
        let alex = keeper(&registry, "Alex", 3);
        let model = alex.model().id();

        let rebuilt = EmbeddedResource::from_value(&registry, model, &alex.to_value()).unwrap();

        assert_eq!(rebuilt, alex);
        assert_eq!(rebuilt.to_document().unwrap(), alex.to_document().unwrap());
    }

    #[test]
    fn root_models_cannot_be_embedded() {
        let registry = registry();

        assert!(matches!(EmbeddedResource::new(&registry, "Zoo"), Err(MapperError::Definition(_))));
    }
}
