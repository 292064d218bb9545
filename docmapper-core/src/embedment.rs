//! Embedment relationships: how nested sub-resources are assigned, dumped and loaded.
//!
//! A one-to-one embedment holds at most one
//! [`EmbeddedResource`](crate::embedded::EmbeddedResource) and is stored as a nested
//! document; a one-to-many embedment holds an
//! [`EmbeddedCollection`](crate::embedded::EmbeddedCollection) stored as an array of
//! nested documents. Embedments never talk to storage: they persist with their parent.

use std::fmt;

use bson::Bson;

use crate::{
    condition::Operator,
    embedded::{EmbeddedCollection, EmbeddedResource},
    error::{MapperError, MapperResult},
    model::{Cardinality, Embedment},
    registry::Registry,
    resource::Persistable,
    value::Value,
};

/// What can be assigned to an embedment.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedValue {
    /// Clears the embedment.
    Absent,
    One(EmbeddedResource),
    Many(Vec<EmbeddedResource>),
    /// A map (one) or a sequence of maps (many) keyed by property names.
    Raw(Value),
}

impl From<EmbeddedResource> for EmbedValue {
    fn from(value: EmbeddedResource) -> Self {
        EmbedValue::One(value)
    }
}

impl From<Option<EmbeddedResource>> for EmbedValue {
    fn from(value: Option<EmbeddedResource>) -> Self {
        value.map(EmbedValue::One).unwrap_or(EmbedValue::Absent)
    }
}

impl From<Vec<EmbeddedResource>> for EmbedValue {
    fn from(value: Vec<EmbeddedResource>) -> Self {
        EmbedValue::Many(value)
    }
}

impl From<Value> for EmbedValue {
    fn from(value: Value) -> Self {
        EmbedValue::Raw(value)
    }
}

/// Per-parent state of one embedment.
#[derive(Clone)]
pub(crate) enum EmbedmentSlot {
    One {
        resource: Option<EmbeddedResource>,
        dirty: bool,
    },
    Many(EmbeddedCollection),
}

impl EmbedmentSlot {
    pub(crate) fn empty(registry: &Registry, embedment: &Embedment) -> Self {
        match embedment.cardinality() {
            Cardinality::One => EmbedmentSlot::One {
                resource: None,
                dirty: false,
            },
            Cardinality::Many => EmbedmentSlot::Many(EmbeddedCollection::new(registry.clone(), embedment)),
        }
    }

    /// Hydrates the slot from the parent's field. A missing or null field leaves it
    /// empty.
    pub(crate) fn load(registry: &Registry, embedment: &Embedment, bson: Option<&Bson>) -> MapperResult<Self> {
        let bson = match bson {
            None | Some(Bson::Null) | Some(Bson::Undefined) => return Ok(EmbedmentSlot::empty(registry, embedment)),
            Some(bson) => bson,
        };

        match (embedment.cardinality(), bson) {
            (Cardinality::One, Bson::Document(document)) => Ok(EmbedmentSlot::One {
                resource: Some(EmbeddedResource::load(registry, embedment.model(), document)?),
                dirty: false,
            }),
            (Cardinality::Many, Bson::Array(items)) => Ok(EmbedmentSlot::Many(EmbeddedCollection::load(
                registry.clone(),
                embedment,
                items,
            )?)),
            (_, other) => Err(MapperError::Serialization(format!(
                "embedment {} expects {}, found {:?}",
                embedment.name(),
                embedment.cardinality().describe(),
                other.element_type()
            ))),
        }
    }

    pub(crate) fn dump(&self) -> MapperResult<Bson> {
        match self {
            EmbedmentSlot::One { resource: None, .. } => Ok(Bson::Null),
            EmbedmentSlot::One {
                resource: Some(resource),
                ..
            } => Ok(Bson::Document(resource.to_document()?)),
            EmbedmentSlot::Many(collection) => collection.dump(),
        }
    }

    /// Assigns a new value, enforcing the embedment's cardinality.
    pub(crate) fn assign(&mut self, registry: &Registry, embedment: &Embedment, value: EmbedValue) -> MapperResult<()> {
        match self {
            EmbedmentSlot::One { resource, dirty } => {
                *resource = match value {
                    EmbedValue::Absent | EmbedValue::Raw(Value::Null) => None,
                    EmbedValue::One(candidate) => {
                        check_model(registry, embedment, &candidate)?;
                        Some(candidate)
                    },
                    EmbedValue::Raw(value @ Value::Map(_)) => {
                        Some(EmbeddedResource::from_value(registry, embedment.model(), &value)?)
                    },
                    EmbedValue::Many(_) | EmbedValue::Raw(Value::Array(_)) => {
                        return Err(cardinality_error(embedment, Cardinality::Many));
                    },
                    EmbedValue::Raw(other) => return Err(raw_error(embedment, &other)),
                };
                *dirty = true;
                Ok(())
            },
            EmbedmentSlot::Many(collection) => {
                let resources = match value {
                    EmbedValue::Absent | EmbedValue::Raw(Value::Null) => Vec::new(),
                    EmbedValue::Many(resources) => resources,
                    EmbedValue::Raw(Value::Array(items)) => items
                        .iter()
                        .map(|item| match item {
                            Value::Map(_) => EmbeddedResource::from_value(registry, embedment.model(), item),
                            other => Err(raw_error(embedment, other)),
                        })
                        .collect::<MapperResult<Vec<_>>>()?,
                    EmbedValue::One(_) | EmbedValue::Raw(Value::Map(_)) => {
                        return Err(cardinality_error(embedment, Cardinality::One));
                    },
                    EmbedValue::Raw(other) => return Err(raw_error(embedment, &other)),
                };
                collection.replace(resources)
            },
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        match self {
            EmbedmentSlot::One { resource, dirty } => *dirty || resource.as_ref().is_some_and(|r| r.is_dirty()),
            EmbedmentSlot::Many(collection) => collection.is_dirty(),
        }
    }

    pub(crate) fn clean(&mut self) {
        match self {
            EmbedmentSlot::One { resource, dirty } => {
                *dirty = false;
                if let Some(resource) = resource {
                    resource.attributes_mut().clean();
                }
            },
            EmbedmentSlot::Many(collection) => collection.clean(),
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        match self {
            EmbedmentSlot::One { resource, .. } => resource
                .as_ref()
                .map(|r| r.to_value())
                .unwrap_or(Value::Null),
            EmbedmentSlot::Many(collection) => collection.to_value(),
        }
    }
}

impl PartialEq for EmbedmentSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EmbedmentSlot::One { resource: a, .. }, EmbedmentSlot::One { resource: b, .. }) => a == b,
            (EmbedmentSlot::Many(a), EmbedmentSlot::Many(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for EmbedmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedmentSlot::One { resource, .. } => fmt::Debug::fmt(resource, f),
            EmbedmentSlot::Many(collection) => fmt::Debug::fmt(collection, f),
        }
    }
}

fn check_model(registry: &Registry, embedment: &Embedment, candidate: &EmbeddedResource) -> MapperResult<()> {
    let attributes = candidate.attributes();

    if !attributes.registry().same_as(registry) || attributes.model_id() != embedment.model() {
        return Err(MapperError::Validation(format!(
            "embedment {} holds {} resources, not {}",
            embedment.name(),
            registry.model(embedment.model()).name(),
            attributes.model().name()
        )));
    }

    Ok(())
}

pub(crate) fn cardinality_error(embedment: &Embedment, found: Cardinality) -> MapperError {
    MapperError::EmbedmentCardinality {
        embedment: embedment.name().to_string(),
        expected: embedment.cardinality().describe(),
        found: found.describe(),
    }
}

fn raw_error(embedment: &Embedment, value: &Value) -> MapperError {
    MapperError::Validation(format!(
        "embedment {} cannot hold a {} value",
        embedment.name(),
        value.kind_name()
    ))
}

fn operand_error(embedment: &Embedment, operator: Operator, value: &Value) -> MapperError {
    MapperError::Translation(format!(
        "operator {operator} on embedment {} cannot take a {} operand",
        embedment.name(),
        value.kind_name()
    ))
}

fn dump_one(registry: &Registry, embedment: &Embedment, value: &Value) -> MapperResult<Bson> {
    let key = registry.model(embedment.model()).key_property().name();

    if value.as_map().and_then(|map| map.get(key)).is_none_or(Value::is_null) {
        return Err(MapperError::Translation(format!(
            "operand for embedment {} has no {key}, so it cannot match a stored resource",
            embedment.name()
        )));
    }

    let resource = EmbeddedResource::from_value(registry, embedment.model(), value)?;
    Ok(Bson::Document(resource.to_document()?))
}

fn dump_many(registry: &Registry, embedment: &Embedment, operator: Operator, items: &[Value]) -> MapperResult<Bson> {
    items
        .iter()
        .map(|item| match item {
            Value::Map(_) => dump_one(registry, embedment, item),
            other => Err(operand_error(embedment, operator, other)),
        })
        .collect::<MapperResult<Vec<_>>>()
        .map(Bson::Array)
}

/// Dumps a condition operand against an embedment. Maps are hydrated into embedded
/// resources first so the operand has exactly the stored shape; pass values obtained
/// from [`Persistable::to_value`] or
/// [`EmbeddedCollection::to_value`] to match existing sub-documents. A map without an
/// identity is a [`MapperError::Translation`].
///
/// One-to-one embedments support `eq` and `ne` against a map or null. One-to-many
/// embedments support `eq` and `ne` against a sequence (deep equality) and `in` and
/// `not_in` against a sequence of candidate elements.
pub(crate) fn dump_operand(
    registry: &Registry,
    embedment: &Embedment,
    operator: Operator,
    operand: &Value,
) -> MapperResult<Bson> {
    match (embedment.cardinality(), operator, operand) {
        (_, op, Value::Null) if op.is_equality() => Ok(Bson::Null),
        (Cardinality::One, op, Value::Map(_)) if op.is_equality() => dump_one(registry, embedment, operand),
        (Cardinality::Many, op, Value::Array(items)) if op.is_equality() || op.is_membership() => {
            dump_many(registry, embedment, operator, items)
        },
        (Cardinality::One, op, _) if !op.is_equality() => Err(MapperError::Translation(format!(
            "operator {operator} is not supported by embedment {}",
            embedment.name()
        ))),
        (Cardinality::Many, op, _) if !op.is_equality() && !op.is_membership() => Err(MapperError::Translation(
            format!("operator {operator} is not supported by embedment {}", embedment.name()),
        )),
        (_, _, other) => Err(operand_error(embedment, operator, other)),
    }
}
