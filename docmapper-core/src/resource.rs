//! Resources and their attribute state.
//!
//! A [`Resource`] is one document of a root model. An
//! [`EmbeddedResource`](crate::embedded::EmbeddedResource) is a sub-document living
//! inside a parent. Both keep their values in an [`AttributeSet`] and share the
//! [`Persistable`] capability: typed get/set, dirty tracking and embedment access.
//! Only [`Resource`] has a [`StorageIdentity`].
//!
//! # Example
//!
//! ```ignore
//! let mut zoo = Resource::new(&registry, "Zoo")?
//!     .with("name", "Central")?
//!     .with("animals", Value::array(["marty", "alex"]))?;
//!
//! zoo.embedded_many_mut("keepers")?.push(keeper)?;
//! assert!(zoo.is_dirty());
//! ```

use std::{collections::BTreeMap, fmt};

use bson::Document;

use crate::{
    codec,
    embedded::{EmbeddedCollection, EmbeddedResource},
    embedment::{EmbedValue, EmbedmentSlot},
    error::{MapperError, MapperResult},
    identifier::Identifier,
    model::{Cardinality, Model, ModelId},
    registry::Registry,
    value::Value,
};

/// Values of one resource, indexed like its model's properties and embedments.
#[derive(Clone)]
pub struct AttributeSet {
    registry: Registry,
    model: ModelId,
    values: Vec<Value>,
    dirty: Vec<bool>,
    embedments: Vec<EmbedmentSlot>,
}

impl AttributeSet {
    /// Fresh attributes: defaults applied, embedments empty, nothing dirty.
    pub(crate) fn new(registry: Registry, model: ModelId) -> MapperResult<Self> {
        let definition = registry.model(model);

        let values = definition
            .properties()
            .iter()
            .map(|property| match property.default_value() {
                Some(value) => codec::typecast(property.kind(), value.clone()),
                None => Ok(Value::Null),
            })
            .collect::<MapperResult<Vec<_>>>()?;

        let embedments = definition
            .embedments()
            .iter()
            .map(|embedment| EmbedmentSlot::empty(&registry, embedment))
            .collect();

        Ok(AttributeSet {
            dirty: vec![false; values.len()],
            values,
            embedments,
            registry,
            model,
        })
    }

    /// Hydrates attributes from a stored document. Missing fields load as null.
    pub(crate) fn load(registry: Registry, model: ModelId, document: &Document) -> MapperResult<Self> {
        let definition = registry.model(model);

        let values = definition
            .properties()
            .iter()
            .map(|property| codec::load(property.kind(), document.get(property.field_name())))
            .collect::<MapperResult<Vec<_>>>()?;

        let embedments = definition
            .embedments()
            .iter()
            .map(|embedment| EmbedmentSlot::load(&registry, embedment, document.get(embedment.field_name())))
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(AttributeSet {
            dirty: vec![false; values.len()],
            values,
            embedments,
            registry,
            model,
        })
    }

    /// The registry defining this resource's model.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The id of the resource's model.
    pub fn model_id(&self) -> ModelId {
        self.model
    }

    /// The resource's model.
    pub fn model(&self) -> &Model {
        self.registry.model(self.model)
    }

    /// The key property's value, if set.
    pub fn key(&self) -> Option<Identifier> {
        self.values[self.model().key_index()].as_identifier()
    }

    /// Sets the key directly, bypassing the persisted-key check.
    pub(crate) fn assign_key(&mut self, id: Identifier) {
        let index = self.model().key_index();
        self.values[index] = Value::Identifier(id);
    }

    /// Marks the key as changed so the next partial dump carries it.
    pub(crate) fn touch_key(&mut self) {
        let index = self.model().key_index();
        self.dirty[index] = true;
    }

    /// The current value of a property.
    pub fn get(&self, name: &str) -> MapperResult<&Value> {
        self.model()
            .property_index(name)
            .map(|index| &self.values[index])
            .ok_or_else(|| self.unknown(name))
    }

    /// Casts and assigns a property, or assigns an embedment from a raw value.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] for unknown names, values the property's
    /// codec rejects, null in a non-nullable property and attempts to change a key
    /// that is already set.
    pub fn set(&mut self, name: &str, value: Value) -> MapperResult<()> {
        let registry = self.registry.clone();
        let model = registry.model(self.model);

        if let Some(index) = model.property_index(name) {
            let property = &model.properties()[index];
            let value = codec::typecast(property.kind(), value)?;
            let current = &self.values[index];

            if property.is_key() {
                if !current.is_null() && *current != value {
                    return Err(MapperError::Validation(format!(
                        "key {}.{} cannot change once set",
                        model.name(),
                        name
                    )));
                }
            } else if value.is_null() && !property.is_nullable() {
                return Err(MapperError::Validation(format!("{}.{} cannot be null", model.name(), name)));
            }

            if *current != value {
                self.values[index] = value;
                self.dirty[index] = true;
            }
            return Ok(());
        }

        if model.embedment(name).is_some() {
            return self.set_embedded(name, EmbedValue::Raw(value));
        }

        Err(self.unknown(name))
    }

    /// Applies a map keyed by property names, storage field names or embedment names.
    pub(crate) fn apply(&mut self, entries: &BTreeMap<String, Value>) -> MapperResult<()> {
        let registry = self.registry.clone();
        let model = registry.model(self.model);

        for (key, value) in entries {
            let name = model
                .properties()
                .iter()
                .find(|p| p.name() == key || p.field_name() == key)
                .map(|p| p.name())
                .or_else(|| {
                    model
                        .embedments()
                        .iter()
                        .find(|e| e.name() == key || e.field_name() == key)
                        .map(|e| e.name())
                })
                .ok_or_else(|| self.unknown(key))?;

            self.set(name, value.clone())?;
        }

        Ok(())
    }

    fn unknown(&self, name: &str) -> MapperError {
        MapperError::Validation(format!("{} has no property {}", self.model().name(), name))
    }

    fn slot_index(&self, name: &str) -> MapperResult<usize> {
        self.model()
            .embedment_index(name)
            .ok_or_else(|| self.unknown(name))
    }

    fn cardinality_error(name: &str, expected: Cardinality, found: Cardinality) -> MapperError {
        MapperError::EmbedmentCardinality {
            embedment: name.to_string(),
            expected: expected.describe(),
            found: found.describe(),
        }
    }

    /// The resource in a one-to-one embedment.
    pub fn embedded(&self, name: &str) -> MapperResult<Option<&EmbeddedResource>> {
        match &self.embedments[self.slot_index(name)?] {
            EmbedmentSlot::One { resource, .. } => Ok(resource.as_ref()),
            EmbedmentSlot::Many(_) => Err(Self::cardinality_error(name, Cardinality::Many, Cardinality::One)),
        }
    }

    /// Mutable access to the resource in a one-to-one embedment.
    pub fn embedded_mut(&mut self, name: &str) -> MapperResult<Option<&mut EmbeddedResource>> {
        let index = self.slot_index(name)?;

        match &mut self.embedments[index] {
            EmbedmentSlot::One { resource, .. } => Ok(resource.as_mut()),
            EmbedmentSlot::Many(_) => Err(Self::cardinality_error(name, Cardinality::Many, Cardinality::One)),
        }
    }

    /// The collection view of a one-to-many embedment.
    pub fn embedded_many(&self, name: &str) -> MapperResult<&EmbeddedCollection> {
        match &self.embedments[self.slot_index(name)?] {
            EmbedmentSlot::Many(collection) => Ok(collection),
            EmbedmentSlot::One { .. } => Err(Self::cardinality_error(name, Cardinality::One, Cardinality::Many)),
        }
    }

    /// Mutable access to a one-to-many embedment.
    pub fn embedded_many_mut(&mut self, name: &str) -> MapperResult<&mut EmbeddedCollection> {
        let index = self.slot_index(name)?;

        match &mut self.embedments[index] {
            EmbedmentSlot::Many(collection) => Ok(collection),
            EmbedmentSlot::One { .. } => Err(Self::cardinality_error(name, Cardinality::One, Cardinality::Many)),
        }
    }

    /// Assigns an embedment, checking cardinality and model.
    pub fn set_embedded(&mut self, name: &str, value: EmbedValue) -> MapperResult<()> {
        let index = self.slot_index(name)?;
        let registry = self.registry.clone();
        let embedment = &registry.model(self.model).embedments()[index];

        self.embedments[index].assign(&registry, embedment, value)
    }

    /// Whether any property or embedment changed since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty.iter().any(|dirty| *dirty) || self.embedments.iter().any(EmbedmentSlot::is_dirty)
    }

    /// Names of changed properties and embedments, in declaration order.
    pub fn changed(&self) -> Vec<&str> {
        let model = self.model();

        model
            .properties()
            .iter()
            .zip(&self.dirty)
            .filter(|(_, dirty)| **dirty)
            .map(|(property, _)| property.name())
            .chain(
                model
                    .embedments()
                    .iter()
                    .zip(&self.embedments)
                    .filter(|(_, slot)| slot.is_dirty())
                    .map(|(embedment, _)| embedment.name()),
            )
            .collect()
    }

    /// Forgets all changes, recursively.
    pub(crate) fn clean(&mut self) {
        self.dirty.iter_mut().for_each(|dirty| *dirty = false);
        self.embedments.iter_mut().for_each(EmbedmentSlot::clean);
    }

    /// Dumps every property and embedment, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] when a non-nullable property is null or a
    /// value cannot be dumped.
    pub fn dump(&self) -> MapperResult<Document> {
        self.dump_where(|_| true, |_| true)
    }

    /// Dumps only changed properties and embedments.
    pub fn dump_changes(&self) -> MapperResult<Document> {
        self.dump_where(|index| self.dirty[index], |index| self.embedments[index].is_dirty())
    }

    fn dump_where(&self, property: impl Fn(usize) -> bool, embedment: impl Fn(usize) -> bool) -> MapperResult<Document> {
        let model = self.model();
        let mut document = Document::new();

        for (index, (descriptor, value)) in model.properties().iter().zip(&self.values).enumerate() {
            if !property(index) {
                continue;
            }
            if value.is_null() && !descriptor.is_nullable() {
                return Err(MapperError::Validation(format!(
                    "{}.{} cannot be null",
                    model.name(),
                    descriptor.name()
                )));
            }
            document.insert(descriptor.field_name(), codec::dump(descriptor.kind(), value)?);
        }

        for (index, (descriptor, slot)) in model.embedments().iter().zip(&self.embedments).enumerate() {
            if embedment(index) {
                document.insert(descriptor.field_name(), slot.dump()?);
            }
        }

        Ok(document)
    }

    /// The attributes as a map keyed by property and embedment names.
    pub fn to_value(&self) -> Value {
        let model = self.model();

        let properties = model
            .properties()
            .iter()
            .zip(&self.values)
            .map(|(property, value)| (property.name().to_string(), value.clone()));
        let embedments = model
            .embedments()
            .iter()
            .zip(&self.embedments)
            .map(|(embedment, slot)| (embedment.name().to_string(), slot.to_value()));

        Value::Map(properties.chain(embedments).collect())
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.registry.same_as(&other.registry)
            && self.model == other.model
            && self.values == other.values
            && self.embedments == other.embedments
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model();
        let mut out = f.debug_struct(model.name());

        for (property, value) in model.properties().iter().zip(&self.values) {
            out.field(property.name(), value);
        }
        for (embedment, slot) in model.embedments().iter().zip(&self.embedments) {
            out.field(embedment.name(), slot);
        }

        out.finish()
    }
}

/// Attribute access shared by root and embedded resources.
pub trait Persistable {
    fn attributes(&self) -> &AttributeSet;

    fn attributes_mut(&mut self) -> &mut AttributeSet;

    fn model(&self) -> &Model {
        self.attributes().model()
    }

    /// The key property's value, if set.
    fn key(&self) -> Option<Identifier> {
        self.attributes().key()
    }

    fn get(&self, name: &str) -> MapperResult<&Value> {
        self.attributes().get(name)
    }

    /// Casts `value` through the property's codec and assigns it. Embedment names
    /// accept raw maps and sequences of maps.
    fn set(&mut self, name: &str, value: impl Into<Value>) -> MapperResult<()> {
        self.attributes_mut().set(name, value.into())
    }

    fn is_dirty(&self) -> bool {
        self.attributes().is_dirty()
    }

    fn changed(&self) -> Vec<&str> {
        self.attributes().changed()
    }

    /// The resource in a one-to-one embedment.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::EmbedmentCardinality`] for one-to-many embedments.
    fn embedded(&self, name: &str) -> MapperResult<Option<&EmbeddedResource>> {
        self.attributes().embedded(name)
    }

    fn embedded_mut(&mut self, name: &str) -> MapperResult<Option<&mut EmbeddedResource>> {
        self.attributes_mut().embedded_mut(name)
    }

    /// Assigns a one-to-one or one-to-many embedment.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::EmbedmentCardinality`] when a sequence is assigned to a
    /// one-to-one embedment or a single resource to a one-to-many embedment.
    fn set_embedded(&mut self, name: &str, value: impl Into<EmbedValue>) -> MapperResult<()> {
        self.attributes_mut().set_embedded(name, value.into())
    }

    /// The collection view of a one-to-many embedment.
    fn embedded_many(&self, name: &str) -> MapperResult<&EmbeddedCollection> {
        self.attributes().embedded_many(name)
    }

    fn embedded_many_mut(&mut self, name: &str) -> MapperResult<&mut EmbeddedCollection> {
        self.attributes_mut().embedded_many_mut(name)
    }

    /// The full storage document.
    fn to_document(&self) -> MapperResult<Document> {
        self.attributes().dump()
    }

    fn to_value(&self) -> Value {
        self.attributes().to_value()
    }
}

/// Where a root resource lives in storage.
pub trait StorageIdentity {
    fn collection(&self) -> &str;

    /// The storage identifier, `None` until the resource is created.
    fn identity(&self) -> Option<Identifier>;

    fn is_persisted(&self) -> bool;

    fn is_new(&self) -> bool {
        !self.is_persisted()
    }
}

/// A document of a root model.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    attributes: AttributeSet,
    persisted: bool,
}

impl Resource {
    /// Creates a new, unsaved resource of the named root model.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Definition`] when the model is unknown or embedded.
    pub fn new(registry: &Registry, model: &str) -> MapperResult<Self> {
        let model = registry.model_by_name(model)?.id();
        Resource::of(registry, model)
    }

    /// Creates a new resource of a root model by id.
    pub fn of(registry: &Registry, model: ModelId) -> MapperResult<Self> {
        let definition = registry.model(model);
        if definition.is_embedded() {
            return Err(MapperError::Definition(format!(
                "{} is embedded and has no collection",
                definition.name()
            )));
        }

        Ok(Resource {
            attributes: AttributeSet::new(registry.clone(), model)?,
            persisted: false,
        })
    }

    /// Hydrates a persisted resource from its stored document.
    pub fn load(registry: &Registry, model: ModelId, document: &Document) -> MapperResult<Self> {
        Ok(Resource {
            attributes: AttributeSet::load(registry.clone(), model, document)?,
            persisted: true,
        })
    }

    /// Builder-style [`Persistable::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> MapperResult<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Builder-style [`Persistable::set_embedded`].
    pub fn with_embedded(mut self, name: &str, value: impl Into<EmbedValue>) -> MapperResult<Self> {
        self.set_embedded(name, value)?;
        Ok(self)
    }

    /// The resource's identifier, once assigned.
    pub fn id(&self) -> Option<Identifier> {
        self.key()
    }

    /// Records a successful create or update.
    pub(crate) fn mark_persisted(&mut self, id: Identifier) {
        self.attributes.assign_key(id);
        self.attributes.clean();
        self.persisted = true;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.persisted = false;
    }

    /// Replaces the attributes with freshly loaded ones.
    pub(crate) fn replace_attributes(&mut self, attributes: AttributeSet) {
        self.attributes = attributes;
        self.persisted = true;
    }
}

impl Persistable for Resource {
    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }
}

impl StorageIdentity for Resource {
    fn collection(&self) -> &str {
        self.model().collection().unwrap_or_default()
    }

    fn identity(&self) -> Option<Identifier> {
        self.key()
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }
}

pub(crate) fn load_attributes(registry: &Registry, model: ModelId, document: &Document) -> MapperResult<AttributeSet> {
    AttributeSet::load(registry.clone(), model, document)
}

#[cfg(test)]
mod tests {
    use bson::{Bson, doc};

    use super::*;
    use crate::model::{ModelBuilder, Property, PropertyType};

    fn registry() -> Registry {
        Registry::builder()
            .define(
                ModelBuilder::new("Heffalump")
                    .property(Property::new("color", PropertyType::STRING).required().with_default("grey"))
                    .property(Property::new("num_spots", PropertyType::INTEGER).field("spots"))
                    .property(Property::new("striped", PropertyType::BOOLEAN))
                    .embeds_one("address", "Address"),
            )
            .define(ModelBuilder::embedded("Address").property(Property::new("street", PropertyType::STRING)))
            .build()
            .unwrap()
    }

    #[test]
    fn new_resources_take_defaults_and_are_clean() {
        let registry = registry();
        let heffalump = Resource::new(&registry, "Heffalump").unwrap();

        assert!(heffalump.is_new());
        assert!(!heffalump.is_dirty());
        assert_eq!(heffalump.id(), None);
        assert_eq!(heffalump.get("color").unwrap(), &Value::from("grey"));
        assert_eq!(heffalump.collection(), "heffalumps");
    }

    #[test]
    fn set_casts_and_tracks_changes() {
        let registry = registry();
        let mut heffalump = Resource::new(&registry, "Heffalump").unwrap();

        heffalump.set("num_spots", 5).unwrap();
        heffalump.set("color", "grey").unwrap();

        assert_eq!(heffalump.changed(), ["num_spots"]);
        assert_eq!(heffalump.attributes().dump_changes().unwrap(), doc! { "spots": 5_i64 });
        assert!(matches!(heffalump.set("num_spots", "five"), Err(MapperError::Validation(_))));
        assert!(matches!(heffalump.set("color", Value::Null), Err(MapperError::Validation(_))));
        assert!(matches!(heffalump.set("size", 1), Err(MapperError::Validation(_))));
    }

    #[test]
    fn dump_follows_declaration_order_and_fields() {
        let registry = registry();
        let mut heffalump = Resource::new(&registry, "Heffalump").unwrap();
        let id = Identifier::new();
        heffalump.attributes_mut().assign_key(id);

        assert_eq!(
            heffalump.to_document().unwrap(),
            doc! {
                "_id": id.as_object_id(),
                "color": "grey",
                "spots": Bson::Null,
                "striped": Bson::Null,
                "address": Bson::Null,
            }
        );
    }

    #[test]
    fn non_nullable_key_is_required_to_dump() {
        let registry = registry();
        let heffalump = Resource::new(&registry, "Heffalump").unwrap();

        assert!(matches!(heffalump.to_document(), Err(MapperError::Validation(_))));
    }

    #[test]
    fn load_reads_storage_fields() {
        let registry = registry();
        let model = registry.model_by_name("Heffalump").unwrap().id();
        let id = Identifier::new();
        let document = doc! { "_id": id.as_object_id(), "color": "blue", "spots": 3_i32 };

        let heffalump = Resource::load(&registry, model, &document).unwrap();

        assert!(heffalump.is_persisted());
        assert!(!heffalump.is_dirty());
        assert_eq!(heffalump.id(), Some(id));
        assert_eq!(heffalump.get("num_spots").unwrap(), &Value::Integer(3));
        assert_eq!(heffalump.get("striped").unwrap(), &Value::Null);
        assert_eq!(heffalump.embedded("address").unwrap(), None);
    }

    #[test]
    fn persisted_keys_cannot_change() {
        let registry = registry();
        let mut heffalump = Resource::new(&registry, "Heffalump").unwrap();
        let id = Identifier::new();

        heffalump.set("id", id.to_hex()).unwrap();
        heffalump.set("id", id).unwrap();

        assert!(matches!(heffalump.set("id", Identifier::new()), Err(MapperError::Validation(_))));
    }

    #[test]
    fn embedded_models_cannot_be_root_resources() {
        let registry = registry();

        assert!(matches!(Resource::new(&registry, "Address"), Err(MapperError::Definition(_))));
    }

    #[test]
    fn embedments_accept_raw_maps() {
        let registry = registry();
        let mut heffalump = Resource::new(&registry, "Heffalump").unwrap();

        heffalump.set("address", Value::map([("street", "Street 1")])).unwrap();

        let address = heffalump.embedded("address").unwrap().unwrap();
        assert_eq!(address.get("street").unwrap(), &Value::from("Street 1"));
        assert_eq!(heffalump.changed(), ["address"]);
    }
}
