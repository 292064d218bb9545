//! Model metadata: property descriptors, embedments and associations.
//!
//! Models are declared with a [`ModelBuilder`] and handed to a
//! [`RegistryBuilder`](crate::registry::RegistryBuilder), which resolves the model
//! names used by embedments and associations into [`ModelId`]s. After that the
//! metadata is immutable.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! let zoo = ModelBuilder::new("Zoo")
//!     .property(Property::new("animals", PropertyType::EmbeddedArray))
//!     .property(Property::new("address", PropertyType::EmbeddedMap))
//!     .embeds_many("keepers", "Keeper");
//!
//! let keeper = ModelBuilder::embedded("Keeper")
//!     .property(Property::new("name", PropertyType::STRING).required());
//! ```

use crate::value::Value;

/// Primitive kinds a scalar property can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    /// UTC timestamp with millisecond precision.
    DateTime,
    Uuid,
}

/// The logical type of a property. Each variant owns a codec, see
/// [`PropertyType::codec`](crate::codec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Scalar(ScalarKind),
    /// Storage identifier (native object id).
    Identifier,
    /// Pointer to another document by identifier.
    Reference,
    /// Ordered sequence of values stored verbatim.
    EmbeddedArray,
    /// String-keyed mapping of values stored verbatim.
    EmbeddedMap,
}

impl PropertyType {
    /// Shorthand for a string scalar.
    pub const STRING: PropertyType = PropertyType::Scalar(ScalarKind::String);
    /// Shorthand for a 64-bit integer scalar.
    pub const INTEGER: PropertyType = PropertyType::Scalar(ScalarKind::Integer);
    /// Shorthand for a double precision float scalar.
    pub const FLOAT: PropertyType = PropertyType::Scalar(ScalarKind::Float);
    /// Shorthand for a boolean scalar.
    pub const BOOLEAN: PropertyType = PropertyType::Scalar(ScalarKind::Boolean);
    /// Shorthand for a UTC timestamp scalar.
    pub const DATETIME: PropertyType = PropertyType::Scalar(ScalarKind::DateTime);
    /// Shorthand for a UUID scalar.
    pub const UUID: PropertyType = PropertyType::Scalar(ScalarKind::Uuid);

    /// Whether values of this type are nested structures in storage.
    pub fn is_collection(&self) -> bool {
        matches!(self, PropertyType::EmbeddedArray | PropertyType::EmbeddedMap)
    }
}

/// Storage field every model's key property maps to.
pub const KEY_FIELD: &str = "_id";

/// Name given to the key property when a model does not declare one.
pub const DEFAULT_KEY: &str = "id";

/// Describes one typed property of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    field: String,
    kind: PropertyType,
    nullable: bool,
    key: bool,
    default: Option<Value>,
}

impl Property {
    /// Declares a nullable property stored under its own name.
    pub fn new(name: impl Into<String>, kind: PropertyType) -> Self {
        let name = name.into();

        Property {
            field: name.clone(),
            name,
            kind,
            nullable: true,
            key: false,
            default: None,
        }
    }

    /// Declares the model's key. Keys are identifiers stored under `_id`.
    pub fn key(name: impl Into<String>) -> Self {
        Property {
            field: KEY_FIELD.to_string(),
            nullable: false,
            key: true,
            ..Property::new(name, PropertyType::Identifier)
        }
    }

    /// Stores the property under a different document field.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Rejects null values on save.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Value assigned to new resources.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The property name used by resources and queries.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document field the property is stored under.
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// The logical type.
    pub fn kind(&self) -> PropertyType {
        self.kind
    }

    /// Whether null values are accepted.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether this property is the model's key.
    pub fn is_key(&self) -> bool {
        self.key
    }

    /// The value new resources start with, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Index of a model inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub(crate) usize);

impl ModelId {
    /// Position of the model in its registry.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Whether a model owns a collection or only lives inside other documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelKind {
    Root { collection: String },
    Embedded,
}

/// How many embedded resources an embedment holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl Cardinality {
    /// Human readable cardinality used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Cardinality::One => "a single embedded resource",
            Cardinality::Many => "a sequence of embedded resources",
        }
    }
}

/// A property of a parent model holding nested sub-resources of an embedded model.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedment {
    pub(crate) name: String,
    pub(crate) field: String,
    pub(crate) model: ModelId,
    pub(crate) cardinality: Cardinality,
}

impl Embedment {
    /// The embedment name used by resources and queries.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document field holding the sub-documents.
    pub fn field_name(&self) -> &str {
        &self.field
    }

    /// The embedded model.
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Whether the embedment holds one or many resources.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// The declaring model holds a reference to the target.
    BelongsTo,
    /// Target resources hold references to the declaring model.
    HasMany,
}

/// A foreign-key style association resolved through reference properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    pub(crate) name: String,
    pub(crate) kind: AssociationKind,
    pub(crate) target: ModelId,
    pub(crate) key: String,
}

impl Association {
    /// The association name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the declaring model or the target holds the reference.
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    /// The associated model.
    pub fn target(&self) -> ModelId {
        self.target
    }

    /// Name of the reference property carrying the link. It lives on the declaring
    /// model for `BelongsTo` and on the target model for `HasMany`.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Resolved, immutable model metadata.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) id: ModelId,
    pub(crate) name: String,
    pub(crate) kind: ModelKind,
    pub(crate) properties: Vec<Property>,
    pub(crate) key: usize,
    pub(crate) embedments: Vec<Embedment>,
    pub(crate) associations: Vec<Association>,
}

impl Model {
    /// The model's id in its registry.
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// The model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the model is a root or an embedded model.
    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    /// The collection of a root model, `None` for embedded models.
    pub fn collection(&self) -> Option<&str> {
        match &self.kind {
            ModelKind::Root { collection } => Some(collection),
            ModelKind::Embedded => None,
        }
    }

    /// Whether resources of this model only live inside parent documents.
    pub fn is_embedded(&self) -> bool {
        self.kind == ModelKind::Embedded
    }

    /// Properties in declaration order. The key property is included.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Position of the key property in [`Model::properties`].
    pub fn key_index(&self) -> usize {
        self.key
    }

    /// The key property.
    pub fn key_property(&self) -> &Property {
        &self.properties[self.key]
    }

    /// Looks a property up by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Position of a property in [`Model::properties`].
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }

    /// Embedments in declaration order.
    pub fn embedments(&self) -> &[Embedment] {
        &self.embedments
    }

    /// Looks an embedment up by name.
    pub fn embedment(&self, name: &str) -> Option<&Embedment> {
        self.embedments.iter().find(|e| e.name == name)
    }

    /// Position of an embedment in [`Model::embedments`].
    pub fn embedment_index(&self, name: &str) -> Option<usize> {
        self.embedments.iter().position(|e| e.name == name)
    }

    /// Associations in declaration order.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Looks an association up by name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingEmbedment {
    pub(crate) name: String,
    pub(crate) field: String,
    pub(crate) model: String,
    pub(crate) cardinality: Cardinality,
}

#[derive(Debug, Clone)]
pub(crate) struct PendingAssociation {
    pub(crate) name: String,
    pub(crate) kind: AssociationKind,
    pub(crate) target: String,
    pub(crate) key: String,
}

/// Declares a model. Names of other models are resolved when the registry is built.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    pub(crate) name: String,
    pub(crate) collection: Option<String>,
    pub(crate) embedded: bool,
    pub(crate) properties: Vec<Property>,
    pub(crate) embedments: Vec<PendingEmbedment>,
    pub(crate) associations: Vec<PendingAssociation>,
}

impl ModelBuilder {
    /// Declares a root model. Its collection defaults to the pluralised snake case
    /// name (`Heffalump` is stored in `heffalumps`).
    pub fn new(name: impl Into<String>) -> Self {
        ModelBuilder {
            name: name.into(),
            collection: None,
            embedded: false,
            properties: Vec::new(),
            embedments: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Declares an embedded model. Its resources only exist inside a parent document.
    pub fn embedded(name: impl Into<String>) -> Self {
        ModelBuilder {
            embedded: true,
            ..ModelBuilder::new(name)
        }
    }

    /// Overrides the derived collection name.
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Adds a property.
    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Embeds at most one resource of `model` under the field `name`.
    pub fn embeds_one(self, name: impl Into<String>, model: impl Into<String>) -> Self {
        self.embeds(name, model, Cardinality::One)
    }

    /// Embeds a sequence of resources of `model` under the field `name`.
    pub fn embeds_many(self, name: impl Into<String>, model: impl Into<String>) -> Self {
        self.embeds(name, model, Cardinality::Many)
    }

    fn embeds(mut self, name: impl Into<String>, model: impl Into<String>, cardinality: Cardinality) -> Self {
        let name = name.into();

        self.embedments.push(PendingEmbedment {
            field: name.clone(),
            name,
            model: model.into(),
            cardinality,
        });
        self
    }

    /// Declares that this model points at `target` through the reference property `key`.
    pub fn belongs_to(mut self, name: impl Into<String>, target: impl Into<String>, key: impl Into<String>) -> Self {
        self.associations.push(PendingAssociation {
            name: name.into(),
            kind: AssociationKind::BelongsTo,
            target: target.into(),
            key: key.into(),
        });
        self
    }

    /// Declares that resources of `target` point at this model through their
    /// reference property `key`.
    pub fn has_many(mut self, name: impl Into<String>, target: impl Into<String>, key: impl Into<String>) -> Self {
        self.associations.push(PendingAssociation {
            name: name.into(),
            kind: AssociationKind::HasMany,
            target: target.into(),
            key: key.into(),
        });
        self
    }

    /// The name of the model being built.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Derives a collection name from a model name: snake case, then a naive plural.
pub fn default_collection_name(model: &str) -> String {
    let mut snake = String::with_capacity(model.len() + 2);

    for (i, ch) in model.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
        } else {
            snake.push(ch);
        }
    }

    if snake.ends_with('s') || snake.ends_with('x') || snake.ends_with("ch") || snake.ends_with("sh") {
        snake.push_str("es");
    } else if snake.ends_with('y')
        && !snake.ends_with("ay")
        && !snake.ends_with("ey")
        && !snake.ends_with("oy")
        && !snake.ends_with("uy")
    {
        snake.pop();
        snake.push_str("ies");
    } else {
        snake.push('s');
    }

    snake
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_names_follow_model_names() {
        assert_eq!(default_collection_name("Heffalump"), "heffalumps");
        assert_eq!(default_collection_name("Zoo"), "zoos");
        assert_eq!(default_collection_name("BlogPost"), "blog_posts");
        assert_eq!(default_collection_name("Category"), "categories");
        assert_eq!(default_collection_name("Address"), "addresses");
        assert_eq!(default_collection_name("Key"), "keys");
    }

    #[test]
    fn key_properties_map_to_the_id_field() {
        let key = Property::key("id");

        assert!(key.is_key());
        assert!(!key.is_nullable());
        assert_eq!(key.field_name(), KEY_FIELD);
        assert_eq!(key.kind(), PropertyType::Identifier);
    }

    #[test]
    fn property_builder_sets_storage_details() {
        let property = Property::new("num_spots", PropertyType::INTEGER)
            .field("spots")
            .required()
            .with_default(0);

        assert_eq!(property.name(), "num_spots");
        assert_eq!(property.field_name(), "spots");
        assert!(!property.is_nullable());
        assert_eq!(property.default_value(), Some(&Value::Integer(0)));
    }
}
