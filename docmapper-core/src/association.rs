//! Foreign-key style associations between root models.
//!
//! Associations are plain reference properties plus reads through the adapter. A
//! `belongs_to` association keeps a [`Reference`] on the declaring resource; a
//! `has_many` association finds the target resources whose reference points back.
//!
//! References are written with the target collection. Reference conditions compare
//! target ids only, so lookups also find the bare form produced when an identifier is
//! assigned directly.
//!
//! # Example
//!
//! ```ignore
//! adapter.set_parent(&mut john, "group", Some(&group))?;
//! adapter.save(&mut john).await?;
//!
//! let members = adapter.children(&group, "users", &[Filter::eq("name", "john")]).await?;
//! ```

use tracing::debug;

use crate::{
    adapter::{Adapter, key_selector},
    condition::{Condition, Operator},
    driver::Driver,
    error::{MapperError, MapperResult},
    identifier::{Identifier, Reference},
    model::{Association, AssociationKind, Model},
    query::Criterion,
    resource::{Persistable, Resource, StorageIdentity},
    translate::{StorageQuery, Translator, merge},
    value::Value,
};

/// Membership operand for a reference property pointing at one of `ids`.
pub(crate) fn reference_candidates(ids: impl IntoIterator<Item = Identifier>) -> Value {
    Value::Array(ids.into_iter().map(Value::Identifier).collect())
}

fn find_association<'m>(model: &'m Model, name: &str, kind: AssociationKind) -> MapperResult<&'m Association> {
    match model.association(name) {
        Some(association) if association.kind() == kind => Ok(association),
        Some(_) => Err(MapperError::Definition(format!(
            "{}.{} is not a {} association",
            model.name(),
            name,
            match kind {
                AssociationKind::BelongsTo => "belongs_to",
                AssociationKind::HasMany => "has_many",
            }
        ))),
        None => Err(MapperError::Definition(format!("{} has no association {}", model.name(), name))),
    }
}

impl<D: Driver> Adapter<D> {
    /// Loads the resource a `belongs_to` association points at. Returns `None` when
    /// the key is null or the target no longer exists.
    pub async fn parent(&self, child: &Resource, name: &str) -> MapperResult<Option<Resource>> {
        let association = find_association(child.model(), name, AssociationKind::BelongsTo)?;

        let Some(id) = child.get(association.key())?.as_identifier() else {
            return Ok(None);
        };

        let target = self.registry().model(association.target());
        let query = StorageQuery {
            limit: Some(1),
            ..StorageQuery::matching(key_selector(id))
        };

        Ok(self.fetch(target, &query).await?.into_iter().next())
    }

    /// Points a `belongs_to` association at `parent`, or clears it. The child is not
    /// saved.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] when the parent is unsaved or of the wrong
    /// model.
    pub fn set_parent(&self, child: &mut Resource, name: &str, parent: Option<&Resource>) -> MapperResult<()> {
        let association = find_association(child.model(), name, AssociationKind::BelongsTo)?.clone();

        let value = match parent {
            None => Value::Null,
            Some(parent) => Value::Reference(self.reference_to(&association, parent)?),
        };

        child.set(association.key(), value)
    }

    fn reference_to(&self, association: &Association, parent: &Resource) -> MapperResult<Reference> {
        if parent.model().id() != association.target() {
            return Err(MapperError::Validation(format!(
                "association {} expects {}, got {}",
                association.name(),
                self.registry().model(association.target()).name(),
                parent.model().name()
            )));
        }

        match (parent.is_persisted(), parent.id()) {
            (true, Some(id)) => Ok(Reference::with_collection(id, parent.collection())),
            _ => Err(MapperError::Validation(format!(
                "{} must be saved before it can be referenced",
                parent.model().name()
            ))),
        }
    }

    /// Reads the resources of a `has_many` association, optionally narrowed by
    /// `criteria`. An unsaved parent has no children.
    pub async fn children(&self, parent: &Resource, name: &str, criteria: &[Criterion]) -> MapperResult<Vec<Resource>> {
        let association = find_association(parent.model(), name, AssociationKind::HasMany)?;

        let Some(id) = parent.id().filter(|_| parent.is_persisted()) else {
            return Ok(Vec::new());
        };

        let target = self.registry().model(association.target());
        let key = target
            .property(association.key())
            .ok_or_else(|| MapperError::Definition(format!("{} has no property {}", target.name(), association.key())))?;

        let translator = Translator::new(self.registry(), target);
        let mut conditions = criteria
            .iter()
            .map(|criterion| translator.condition(criterion))
            .collect::<MapperResult<Vec<_>>>()?;
        conditions.push(Condition::new(key, Operator::In, reference_candidates([id]))?);

        self.fetch(target, &StorageQuery::matching(merge(conditions))).await
    }

    /// Links `child` to `parent` through a `has_many` association and saves the child.
    pub async fn append_child(&self, parent: &Resource, name: &str, child: &mut Resource) -> MapperResult<()> {
        let association = find_association(parent.model(), name, AssociationKind::HasMany)?;
        let reference = self.link_reference(association, parent, child)?;

        child.set(association.key(), reference)?;
        self.save(child).await
    }

    /// Makes `children` the complete set of a `has_many` association. Previously linked
    /// resources missing from `children` have their key cleared. Every touched
    /// resource is saved.
    pub async fn replace_children(&self, parent: &Resource, name: &str, children: &mut [Resource]) -> MapperResult<()> {
        let association = find_association(parent.model(), name, AssociationKind::HasMany)?;
        let current = self.children(parent, name, &[]).await?;

        for child in children.iter() {
            self.link_reference(association, parent, child)?;
        }

        let kept = children.iter().filter_map(Resource::id).collect::<Vec<_>>();
        for mut orphan in current {
            if orphan.id().is_some_and(|id| kept.contains(&id)) {
                continue;
            }

            debug!("Unlinking {} {:?} from {}", orphan.model().name(), orphan.id(), association.name());
            orphan.set(association.key(), Value::Null)?;
            self.save(&mut orphan).await?;
        }

        for child in children.iter_mut() {
            let reference = self.link_reference(association, parent, child)?;
            child.set(association.key(), reference)?;
            self.save(child).await?;
        }

        Ok(())
    }

    fn link_reference(&self, association: &Association, parent: &Resource, child: &Resource) -> MapperResult<Reference> {
        if child.model().id() != association.target() {
            return Err(MapperError::Validation(format!(
                "association {} holds {}, got {}",
                association.name(),
                self.registry().model(association.target()).name(),
                child.model().name()
            )));
        }

        match (parent.is_persisted(), parent.id()) {
            (true, Some(id)) => Ok(Reference::with_collection(id, parent.collection())),
            _ => Err(MapperError::Validation(format!(
                "{} must be saved before children can be linked",
                parent.model().name()
            ))),
        }
    }
}
