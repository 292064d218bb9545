//! Query translation into storage selectors.
//!
//! The [`Translator`] resolves property names against one model, dumps operands, groups
//! conditions by storage field in first-appearance order and merges each group into one
//! selector entry. The result is a [`StorageQuery`] a driver executes as is.
//!
//! # Example
//!
//! ```ignore
//! let model = registry.model_by_name("Heffalump")?;
//! let query = Query::builder()
//!     .filter(Filter::gt("num_spots", 2))
//!     .filter(Filter::ne("num_spots", 3))
//!     .build();
//!
//! let storage = Translator::new(&registry, model).translate(&query)?;
//! assert_eq!(storage.selector, doc! { "num_spots": { "$gt": 2_i64, "$ne": 3_i64 } });
//! ```

use bson::{Bson, Document};

use crate::{
    condition::{Condition, FieldSelector},
    embedment,
    error::{MapperError, MapperResult},
    model::Model,
    query::{Criterion, Query, SortDirection},
    registry::Registry,
};

/// A query in storage terms: selector, sort keys by field, pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageQuery {
    pub selector: Document,
    pub sort: Vec<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl StorageQuery {
    /// A query with only a selector.
    pub fn matching(selector: Document) -> Self {
        StorageQuery {
            selector,
            ..StorageQuery::default()
        }
    }

    /// Sort keys as an ordered `{ field: 1 | -1 }` document.
    pub fn sort_document(&self) -> Document {
        self.sort
            .iter()
            .map(|(field, direction)| (field.clone(), Bson::Int32(direction.as_i32())))
            .collect()
    }
}

/// Translates queries for one model.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    registry: &'a Registry,
    model: &'a Model,
}

impl<'a> Translator<'a> {
    /// Creates a translator for queries on `model`.
    pub fn new(registry: &'a Registry, model: &'a Model) -> Self {
        Translator { registry, model }
    }

    /// Resolves a criterion against the model.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Translation`] when the property is unknown or does not
    /// support the operator, and [`MapperError::Validation`] when the operand cannot
    /// be dumped.
    pub fn condition(&self, criterion: &Criterion) -> MapperResult<Condition> {
        if let Some(property) = self.model.property(&criterion.property) {
            let condition = Condition::new(property, criterion.operator, criterion.operand.clone())?;

            return Ok(match &criterion.options {
                Some(options) => condition.with_options(options.clone()),
                None => condition,
            });
        }

        if let Some(embedment) = self.model.embedment(&criterion.property) {
            let operand = embedment::dump_operand(self.registry, embedment, criterion.operator, &criterion.operand)?;

            return Ok(Condition::from_dumped(embedment.field_name(), criterion.operator, operand, true));
        }

        Err(MapperError::Translation(format!(
            "{} has no property {}",
            self.model.name(),
            criterion.property
        )))
    }

    /// Builds the selector for conjunctive criteria.
    pub fn selector(&self, criteria: &[Criterion]) -> MapperResult<Document> {
        let conditions = criteria
            .iter()
            .map(|criterion| self.condition(criterion))
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(merge(conditions))
    }

    /// Translates a query whose links have already been resolved into `extra`
    /// conditions.
    pub fn translate_with(&self, query: &Query, extra: Vec<Condition>) -> MapperResult<StorageQuery> {
        let mut conditions = query
            .criteria
            .iter()
            .map(|criterion| self.condition(criterion))
            .collect::<MapperResult<Vec<_>>>()?;
        conditions.extend(extra);

        let sort = query
            .sort
            .iter()
            .map(|sort| {
                self.model
                    .property(&sort.property)
                    .map(|property| (property.field_name().to_string(), sort.direction))
                    .ok_or_else(|| {
                        MapperError::Translation(format!(
                            "cannot sort {} by unknown property {}",
                            self.model.name(),
                            sort.property
                        ))
                    })
            })
            .collect::<MapperResult<Vec<_>>>()?;

        Ok(StorageQuery {
            selector: merge(conditions),
            sort,
            limit: query.limit,
            offset: query.offset,
        })
    }

    /// Translates a query without links.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Translation`] when the query carries links, which only
    /// the adapter can resolve.
    pub fn translate(&self, query: &Query) -> MapperResult<StorageQuery> {
        if let Some(link) = query.links.first() {
            return Err(MapperError::Translation(format!(
                "link through {} must be resolved before translation",
                link.association
            )));
        }

        self.translate_with(query, Vec::new())
    }
}

/// Groups conditions by field in first-appearance order and ANDs the groups.
pub fn merge(conditions: impl IntoIterator<Item = Condition>) -> Document {
    let mut fields: Vec<FieldSelector> = Vec::new();

    for condition in conditions {
        match fields.iter_mut().find(|f| f.field() == condition.field()) {
            Some(field) => field.push(condition),
            None => {
                let mut field = FieldSelector::new(condition.field());
                field.push(condition);
                fields.push(field);
            },
        }
    }

    let mut selector = Document::new();
    let mut spilled = Vec::new();

    for field in fields {
        let name = field.field().to_string();
        let (value, clauses) = field.finish();

        selector.insert(name, value);
        spilled.extend(clauses.into_iter().map(Bson::Document));
    }

    if !spilled.is_empty() {
        selector.insert("$and", Bson::Array(spilled));
    }

    selector
}
