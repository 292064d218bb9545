//! Single-field predicates and their storage selector fragments.
//!
//! A [`Condition`] pairs a storage field with an [`Operator`] and an operand that has
//! already been dumped through the property's codec. Conditions render to fragments,
//! and a [`FieldSelector`] folds every fragment for one field into the selector entry
//! for that field.
//!
//! # Example
//!
//! ```ignore
//! let spots = model.property("num_spots").unwrap();
//!
//! let mut field = FieldSelector::new(spots.field_name());
//! field.push(Condition::new(spots, Operator::Gt, 2)?);
//! field.push(Condition::new(spots, Operator::Ne, 3)?);
//!
//! // { "num_spots": { "$gt": 2, "$ne": 3 } }
//! let (value, spilled) = field.finish();
//! ```

use std::fmt;

use bson::{Bson, Document};

use crate::{
    codec::{self, dump_element},
    error::{MapperError, MapperResult},
    identifier::Reference,
    model::{Property, PropertyType},
    value::Value,
};

/// Comparison operators available to conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Regex,
}

impl Operator {
    /// The selector key this operator renders to.
    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
            Operator::In => "$in",
            Operator::NotIn => "$nin",
            Operator::Regex => "$regex",
        }
    }

    /// Whether this is `eq` or `ne`.
    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq | Operator::Ne)
    }

    /// Whether this is `in` or `not_in`.
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Regex => "regex",
        };
        f.write_str(name)
    }
}

/// Dumps one operand. References compare on their target id alone, so a stored
/// reference matches whether or not it carries a collection.
fn dump_operand(kind: PropertyType, operand: &Value) -> MapperResult<Bson> {
    match kind {
        PropertyType::Reference => match codec::typecast(kind, operand.clone())? {
            Value::Reference(reference) => Ok(Bson::from(reference.target_id)),
            _ => Ok(Bson::Null),
        },
        kind => codec::dump(kind, operand),
    }
}

/// A predicate on one storage field with a dumped operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    field: String,
    operator: Operator,
    operand: Bson,
    options: Option<String>,
    deep: bool,
}

impl Condition {
    /// Builds a condition on a property, dumping `operand` through the property's codec.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Translation`] when the property's type does not support
    /// `operator` or the operand has the wrong shape for it, and
    /// [`MapperError::Validation`] when the operand cannot be dumped.
    pub fn new(property: &Property, operator: Operator, operand: impl Into<Value>) -> MapperResult<Self> {
        let kind = property.kind();
        let operand = operand.into();

        if !kind.codec().supports(operator) {
            return Err(MapperError::Translation(format!(
                "operator {operator} is not supported by {} property {}",
                kind.codec().name(),
                property.name()
            )));
        }

        let dumped = match operator {
            Operator::In | Operator::NotIn => {
                let Value::Array(items) = operand else {
                    return Err(MapperError::Translation(format!(
                        "{operator} on {} needs a sequence operand, got {}",
                        property.name(),
                        operand.kind_name()
                    )));
                };

                let items = items
                    .iter()
                    .map(|item| match kind {
                        PropertyType::EmbeddedArray => dump_element(item),
                        kind => dump_operand(kind, item),
                    })
                    .collect::<MapperResult<Vec<_>>>()?;
                Bson::Array(items)
            },
            Operator::Regex => match operand {
                Value::String(pattern) => Bson::String(pattern),
                other => {
                    return Err(MapperError::Translation(format!(
                        "regex on {} needs a pattern string, got {}",
                        property.name(),
                        other.kind_name()
                    )));
                },
            },
            _ => dump_operand(kind, &operand)?,
        };

        let field = match kind {
            PropertyType::Reference => format!("{}.{}", property.field_name(), Reference::TARGET_ID),
            _ => property.field_name().to_string(),
        };

        Ok(Condition {
            field,
            operator,
            operand: dumped,
            options: None,
            deep: kind.is_collection(),
        })
    }

    /// Builds a condition from an operand dumped elsewhere, such as embedded resources.
    /// `deep` forces equality into operator form.
    pub fn from_dumped(field: impl Into<String>, operator: Operator, operand: Bson, deep: bool) -> Self {
        Condition {
            field: field.into(),
            operator,
            operand,
            options: None,
            deep,
        }
    }

    /// Regex flags (`i`, `m`, `s`, `x`) rendered as `$options`.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        let options = options.into();
        self.options = (!options.is_empty()).then_some(options);
        self
    }

    /// The storage field, possibly a dotted path.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The comparison operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The operand in storage form.
    pub fn operand(&self) -> &Bson {
        &self.operand
    }

    /// Renders the fragment for this condition.
    pub fn render(&self) -> Fragment {
        let structured = matches!(self.operand, Bson::Document(_) | Bson::Array(_));

        if self.operator == Operator::Eq && !self.deep && !structured {
            return Fragment::Equals(self.operand.clone());
        }

        let mut operators = vec![(self.operator.key(), self.operand.clone())];
        if let (Operator::Regex, Some(options)) = (self.operator, &self.options) {
            operators.push(("$options", Bson::String(options.clone())));
        }

        Fragment::Operators(operators)
    }
}

/// The selector form of one condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Direct form `{ field: value }`.
    Equals(Bson),
    /// Operator form `{ field: { $op: value, .. } }`. Keys rendered together stay
    /// together when merged.
    Operators(Vec<(&'static str, Bson)>),
}

/// Folds all fragments for one field into a single selector entry.
#[derive(Debug, Clone)]
pub struct FieldSelector {
    field: String,
    fragments: Vec<Fragment>,
}

impl FieldSelector {
    /// Starts an empty selector entry for `field`.
    pub fn new(field: impl Into<String>) -> Self {
        FieldSelector {
            field: field.into(),
            fragments: Vec::new(),
        }
    }

    /// The storage field this entry selects on.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Adds a condition's fragment.
    pub fn push(&mut self, condition: Condition) {
        self.fragments.push(condition.render());
    }

    /// Returns the value stored under the field plus clauses that must be ANDed at the
    /// top level. A lone equality stays in direct form. Otherwise every fragment is
    /// merged into one operator document; a fragment whose keys are already taken is
    /// spilled as its own `{ field: { .. } }` clause instead of overwriting.
    pub fn finish(self) -> (Bson, Vec<Document>) {
        let FieldSelector { field, fragments } = self;

        if let [Fragment::Equals(value)] = fragments.as_slice() {
            return (value.clone(), Vec::new());
        }

        let mut merged = Document::new();
        let mut spilled = Vec::new();

        for fragment in fragments {
            let operators = match fragment {
                Fragment::Equals(value) => vec![(Operator::Eq.key(), value)],
                Fragment::Operators(operators) => operators,
            };

            if operators.iter().any(|(key, _)| merged.contains_key(*key)) {
                let mut clause = Document::new();
                for (key, value) in operators {
                    clause.insert(key, value);
                }

                let mut entry = Document::new();
                entry.insert(field.clone(), clause);
                spilled.push(entry);
            } else {
                for (key, value) in operators {
                    merged.insert(key, value);
                }
            }
        }

        (Bson::Document(merged), spilled)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    fn spots() -> Property {
        Property::new("num_spots", PropertyType::INTEGER)
    }

    fn merge(conditions: Vec<Condition>) -> (Bson, Vec<Document>) {
        let mut field = FieldSelector::new(conditions[0].field().to_string());
        for condition in conditions {
            field.push(condition);
        }
        field.finish()
    }

    #[test]
    fn lone_scalar_equality_uses_direct_form() {
        let condition = Condition::new(&spots(), Operator::Eq, 5).unwrap();

        assert_eq!(condition.render(), Fragment::Equals(Bson::Int64(5)));
        assert_eq!(merge(vec![condition]), (Bson::Int64(5), vec![]));
    }

    #[test]
    fn conditions_on_one_field_merge() {
        let (value, spilled) = merge(vec![
            Condition::new(&spots(), Operator::Gt, 2).unwrap(),
            Condition::new(&spots(), Operator::Ne, 3).unwrap(),
        ]);

        assert_eq!(value, Bson::Document(doc! { "$gt": 2_i64, "$ne": 3_i64 }));
        assert!(spilled.is_empty());
    }

    #[test]
    fn repeated_operators_spill_instead_of_overwriting() {
        let (value, spilled) = merge(vec![
            Condition::new(&spots(), Operator::Ne, 3).unwrap(),
            Condition::new(&spots(), Operator::Ne, 4).unwrap(),
            Condition::new(&spots(), Operator::Eq, 5).unwrap(),
        ]);

        assert_eq!(value, Bson::Document(doc! { "$ne": 3_i64, "$eq": 5_i64 }));
        assert_eq!(spilled, vec![doc! { "num_spots": { "$ne": 4_i64 } }]);
    }

    #[test]
    fn collection_equality_is_deep() {
        let animals = Property::new("animals", PropertyType::EmbeddedArray);
        let condition = Condition::new(&animals, Operator::Eq, Value::array(["marty", "alex"])).unwrap();

        assert_eq!(
            condition.render(),
            Fragment::Operators(vec![("$eq", Bson::Array(vec!["marty".into(), "alex".into()]))])
        );
    }

    #[test]
    fn membership_dumps_each_element() {
        let owner = Property::new("owner", PropertyType::Identifier);
        let id = crate::identifier::Identifier::new();
        let condition = Condition::new(&owner, Operator::In, Value::array([id.to_hex()])).unwrap();

        assert_eq!(condition.operand(), &Bson::Array(vec![Bson::from(id)]));

        let err = Condition::new(&owner, Operator::In, id).unwrap_err();
        assert!(matches!(err, MapperError::Translation(_)));
    }

    #[test]
    fn references_compare_on_target_id() {
        let group = Property::new("group_id", PropertyType::Reference);
        let id = crate::identifier::Identifier::new();

        let condition = Condition::new(&group, Operator::Eq, Reference::with_collection(id, "groups")).unwrap();
        assert_eq!(condition.field(), "group_id.target_id");
        assert_eq!(condition.render(), Fragment::Equals(Bson::from(id)));

        let condition = Condition::new(&group, Operator::NotIn, Value::array([Value::Identifier(id), Value::Null])).unwrap();
        assert_eq!(condition.operand(), &Bson::Array(vec![Bson::from(id), Bson::Null]));
    }

    #[test]
    fn regex_renders_pattern_and_options() {
        let name = Property::new("name", PropertyType::STRING);
        let condition = Condition::new(&name, Operator::Regex, "john|jane")
            .unwrap()
            .with_options("i");

        assert_eq!(
            condition.render(),
            Fragment::Operators(vec![
                ("$regex", Bson::String("john|jane".into())),
                ("$options", Bson::String("i".into())),
            ])
        );
    }

    #[test]
    fn unsupported_operators_are_translation_errors() {
        let address = Property::new("address", PropertyType::EmbeddedMap);

        for operator in [Operator::Gt, Operator::In, Operator::Regex] {
            let err = Condition::new(&address, operator, Value::map([("street", "x")])).unwrap_err();
            assert!(matches!(err, MapperError::Translation(_)), "{operator} was accepted");
        }
    }

    #[test]
    fn operands_are_validated_by_the_codec() {
        let err = Condition::new(&spots(), Operator::Gt, "two").unwrap_err();
        assert!(matches!(err, MapperError::Validation(_)));
    }
}
