//! Model registry with an explicit bootstrap phase.
//!
//! Models are defined on a [`RegistryBuilder`]. [`RegistryBuilder::build`] resolves
//! every embedment and association by name, validates keys and fields, and returns an
//! immutable [`Registry`]. The registry is a cheap `Arc` handle that can be shared
//! across threads without synchronisation; nothing can be added to it afterwards.
//!
//! A registry may also be installed process-wide once with [`Registry::install`].

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, OnceLock},
};

use crate::{
    error::{MapperError, MapperResult},
    model::{
        Association, AssociationKind, DEFAULT_KEY, Embedment, KEY_FIELD, Model, ModelBuilder,
        ModelId, ModelKind, Property, PropertyType, default_collection_name,
    },
};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Collects model definitions during bootstrap.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    models: Vec<ModelBuilder>,
}

impl RegistryBuilder {
    /// Creates a builder with no models.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model definition. Names are resolved in [`RegistryBuilder::build`].
    pub fn define(mut self, model: ModelBuilder) -> Self {
        self.models.push(model);
        self
    }

    /// Resolves all definitions into an immutable registry.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Definition`] for duplicate model names, duplicate
    /// property or field names, non-identifier keys, embedments pointing at root
    /// models, associations pointing at unknown models or at non-reference keys.
    pub fn build(self) -> MapperResult<Registry> {
        let mut by_name = HashMap::with_capacity(self.models.len());

        for (index, model) in self.models.iter().enumerate() {
            if by_name.insert(model.name.clone(), ModelId(index)).is_some() {
                return Err(MapperError::Definition(format!("model {} is defined twice", model.name)));
            }
        }

        let lookup = |owner: &str, name: &str| -> MapperResult<ModelId> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| MapperError::Definition(format!("{owner} refers to unknown model {name}")))
        };

        let mut models = Vec::with_capacity(self.models.len());

        for (index, definition) in self.models.iter().enumerate() {
            let (properties, key) = resolve_properties(definition)?;

            let embedments = definition
                .embedments
                .iter()
                .map(|pending| {
                    let model = lookup(&definition.name, &pending.model)?;

                    if !self.models[model.0].embedded {
                        return Err(MapperError::Definition(format!(
                            "{}.{} embeds {} which is not an embedded model",
                            definition.name, pending.name, pending.model
                        )));
                    }

                    Ok(Embedment {
                        name: pending.name.clone(),
                        field: pending.field.clone(),
                        model,
                        cardinality: pending.cardinality,
                    })
                })
                .collect::<MapperResult<Vec<_>>>()?;

            let associations = definition
                .associations
                .iter()
                .map(|pending| {
                    let target = lookup(&definition.name, &pending.target)?;

                    Ok(Association {
                        name: pending.name.clone(),
                        kind: pending.kind,
                        target,
                        key: pending.key.clone(),
                    })
                })
                .collect::<MapperResult<Vec<_>>>()?;

            let kind = if definition.embedded {
                if !associations.is_empty() {
                    return Err(MapperError::Definition(format!(
                        "embedded model {} cannot declare associations",
                        definition.name
                    )));
                }
                ModelKind::Embedded
            } else {
                ModelKind::Root {
                    collection: definition
                        .collection
                        .clone()
                        .unwrap_or_else(|| default_collection_name(&definition.name)),
                }
            };

            let model = Model {
                id: ModelId(index),
                name: definition.name.clone(),
                kind,
                properties,
                key,
                embedments,
                associations,
            };

            check_fields(&model)?;
            models.push(model);
        }

        for model in &models {
            for association in &model.associations {
                check_association(&models, model, association)?;
            }
        }

        Ok(Registry {
            inner: Arc::new(RegistryInner { models, by_name }),
        })
    }
}

fn resolve_properties(definition: &ModelBuilder) -> MapperResult<(Vec<Property>, usize)> {
    let mut properties = definition.properties.clone();
    let keys = properties
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_key())
        .map(|(i, _)| i)
        .collect::<Vec<_>>();

    let key = match keys.as_slice() {
        [] => {
            if properties.iter().any(|p| p.name() == DEFAULT_KEY) {
                return Err(MapperError::Definition(format!(
                    "{}.{} must be declared with Property::key",
                    definition.name, DEFAULT_KEY
                )));
            }
            properties.insert(0, Property::key(DEFAULT_KEY));
            0
        },
        [key] => *key,
        _ => {
            return Err(MapperError::Definition(format!("{} declares more than one key", definition.name)));
        },
    };

    let property = &properties[key];
    if property.kind() != PropertyType::Identifier || property.field_name() != KEY_FIELD {
        return Err(MapperError::Definition(format!(
            "key {}.{} must be an identifier stored under {}",
            definition.name,
            property.name(),
            KEY_FIELD
        )));
    }

    Ok((properties, key))
}

fn check_fields(model: &Model) -> MapperResult<()> {
    let mut names = HashSet::new();
    let mut fields = HashSet::new();

    let declared = model
        .properties
        .iter()
        .map(|p| (p.name(), p.field_name()))
        .chain(model.embedments.iter().map(|e| (e.name(), e.field_name())));

    for (name, field) in declared {
        if !names.insert(name) {
            return Err(MapperError::Definition(format!("{}.{} is declared twice", model.name, name)));
        }
        if !fields.insert(field) {
            return Err(MapperError::Definition(format!(
                "{}.{} reuses storage field {}",
                model.name, name, field
            )));
        }
    }

    Ok(())
}

fn check_association(models: &[Model], model: &Model, association: &Association) -> MapperResult<()> {
    let target = &models[association.target.0];

    if target.is_embedded() {
        return Err(MapperError::Definition(format!(
            "{}.{} points at embedded model {}",
            model.name, association.name, target.name
        )));
    }

    let holder = match association.kind {
        AssociationKind::BelongsTo => model,
        AssociationKind::HasMany => target,
    };

    match holder.property(&association.key) {
        Some(property) if property.kind() == PropertyType::Reference => Ok(()),
        Some(_) => Err(MapperError::Definition(format!(
            "{}.{} must be a reference to back association {}.{}",
            holder.name, association.key, model.name, association.name
        ))),
        None => Err(MapperError::Definition(format!(
            "association {}.{} needs property {}.{}",
            model.name, association.name, holder.name, association.key
        ))),
    }
}

#[derive(Debug)]
struct RegistryInner {
    models: Vec<Model>,
    by_name: HashMap<String, ModelId>,
}

/// Immutable, shareable set of resolved models.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Creates a [`RegistryBuilder`].
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the model behind an id handed out by this registry.
    ///
    /// # Panics
    ///
    /// Panics if the id comes from another registry with more models.
    pub fn model(&self, id: ModelId) -> &Model {
        &self.inner.models[id.0]
    }

    /// Looks a model up by name.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Definition`] when no model has that name.
    pub fn model_by_name(&self, name: &str) -> MapperResult<&Model> {
        self.inner
            .by_name
            .get(name)
            .map(|id| self.model(*id))
            .ok_or_else(|| MapperError::Definition(format!("unknown model {name}")))
    }

    /// Iterates models in definition order.
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.inner.models.iter()
    }

    /// Whether two handles share the same definitions.
    pub fn same_as(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Installs this registry as the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Definition`] if a registry was already installed.
    pub fn install(self) -> MapperResult<&'static Registry> {
        GLOBAL
            .set(self)
            .map_err(|_| MapperError::Definition("a global registry is already installed".into()))?;

        GLOBAL
            .get()
            .ok_or_else(|| MapperError::Definition("global registry is not installed".into()))
    }

    /// The process-wide registry, if one was installed.
    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }
}
