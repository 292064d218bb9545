//! In-memory evaluation of storage selectors.
//!
//! This module evaluates the selectors produced by the
//! [`Translator`](crate::translate::Translator) against BSON documents with document
//! store semantics: an array field matches when any element matches, a missing
//! field equals null, and numbers compare across widths. It backs the in-memory
//! driver and filtering of embedded collections.

use std::{borrow::Borrow, cmp::Ordering};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use regex::RegexBuilder;

use crate::{
    error::{MapperError, MapperResult},
    query::SortDirection,
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalised to `f64`. Maps compare entry by entry in key order,
/// as the document store compares embedded documents.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    Binary(&'a [u8]),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    /// Values with no comparison semantics (code, timestamps, ...).
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(value) => Comparable::Binary(&value.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Binary(_) => 5,
            Comparable::ObjectId(_) => 6,
            Comparable::Bool(_) => 7,
            Comparable::DateTime(_) => 8,
            Comparable::Opaque => 9,
        }
    }

    /// Total order used for sorting: by type first, then by value.
    fn total_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| match (self, other) {
                (Comparable::Array(a), Comparable::Array(b)) => a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| x.total_cmp(y))
                    .find(|o| o.is_ne())
                    .unwrap_or_else(|| a.len().cmp(&b.len())),
                _ => self.partial_cmp(other).unwrap_or(Ordering::Equal),
            })
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a possibly dotted path inside a document.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

fn is_operator_document(value: &Bson) -> bool {
    match value {
        Bson::Document(doc) => doc.keys().next().is_some_and(|k| k.starts_with('$')),
        _ => false,
    }
}

/// Equality with array fan-out: an array field also matches when one of its elements
/// equals the operand. A null operand matches missing fields.
fn equals(field: Option<&Bson>, operand: &Bson) -> bool {
    let operand = Comparable::from(operand);

    match field {
        None => operand == Comparable::Null,
        Some(value) => {
            let value = Comparable::from(value);
            if value == operand {
                return true;
            }
            match value {
                Comparable::Array(items) => items.iter().any(|item| item == &operand),
                _ => false,
            }
        },
    }
}

fn compare(field: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let Some(value) = field else {
        return false;
    };
    let operand = Comparable::from(operand);

    let check = |candidate: &Comparable<'_>| {
        candidate
            .partial_cmp(&operand)
            .is_some_and(&accept)
    };

    match Comparable::from(value) {
        Comparable::Array(items) => items.iter().any(check),
        value => check(&value),
    }
}

fn regex_matches(field: Option<&Bson>, pattern: &Bson, options: &str) -> MapperResult<bool> {
    let Bson::String(pattern) = pattern else {
        return Err(MapperError::Translation("$regex requires a string pattern".into()));
    };

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| MapperError::Translation(format!("invalid pattern {pattern:?}: {e}")))?;

    Ok(match field {
        Some(Bson::String(s)) => regex.is_match(s),
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| matches!(item, Bson::String(s) if regex.is_match(s))),
        _ => false,
    })
}

fn operand_list<'a>(operator: &str, operand: &'a Bson) -> MapperResult<&'a [Bson]> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(MapperError::Translation(format!("{operator} requires an array operand"))),
    }
}

/// Evaluates an operator document (`{ $gt: 2, $ne: 3 }`) against one field.
fn field_matches(field: Option<&Bson>, operators: &Document) -> MapperResult<bool> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => equals(field, operand),
            "$ne" => !equals(field, operand),
            "$gt" => compare(field, operand, |o| o == Ordering::Greater),
            "$gte" => compare(field, operand, |o| o != Ordering::Less),
            "$lt" => compare(field, operand, |o| o == Ordering::Less),
            "$lte" => compare(field, operand, |o| o != Ordering::Greater),
            "$in" => operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals(field, candidate)),
            "$nin" => !operand_list(operator, operand)?
                .iter()
                .any(|candidate| equals(field, candidate)),
            "$exists" => field.is_some() == matches!(operand, Bson::Boolean(true)),
            "$regex" => {
                let options = operators.get_str("$options").unwrap_or("");
                regex_matches(field, operand, options)?
            },
            "$options" => true,
            "$not" => match operand {
                Bson::Document(inner) => !field_matches(field, inner)?,
                _ => return Err(MapperError::Translation("$not requires an operator document".into())),
            },
            other => {
                return Err(MapperError::Translation(format!("unsupported selector operator {other}")));
            },
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'a>(operator: &str, value: &'a Bson) -> MapperResult<impl Iterator<Item = &'a Document>> {
    let items = operand_list(operator, value)?;

    if items.iter().any(|item| item.as_document().is_none()) {
        return Err(MapperError::Translation(format!("{operator} requires an array of selectors")));
    }

    Ok(items.iter().filter_map(Bson::as_document))
}

/// Whether `document` satisfies `selector`. An empty selector matches everything.
///
/// # Errors
///
/// Returns [`MapperError::Translation`] for operators this evaluator does not know
/// and for malformed operands.
pub fn matches(document: &Document, selector: &Document) -> MapperResult<bool> {
    for (key, condition) in selector {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            },
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            },
            "$nor" => {
                let mut none = true;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            },
            other if other.starts_with('$') => {
                return Err(MapperError::Translation(format!("unsupported selector operator {other}")));
            },
            path => {
                let field = lookup(document, path);

                match condition {
                    Bson::Document(operators) if is_operator_document(condition) => {
                        field_matches(field, operators)?
                    },
                    value => equals(field, value),
                }
            },
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Keeps the documents matching `selector`, preserving their order.
pub fn filter<'a, I>(documents: I, selector: &Document) -> MapperResult<Vec<&'a Document>>
where
    I: IntoIterator<Item = &'a Document>,
{
    let mut matched = Vec::new();

    for document in documents {
        if matches(document, selector)? {
            matched.push(document);
        }
    }

    Ok(matched)
}

/// Sorts documents by the given keys, in order. The sort is stable, so documents
/// that compare equal keep their original order.
pub fn sort<D: Borrow<Document>>(documents: &mut [D], keys: &[(String, SortDirection)]) {
    if keys.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        keys
            .iter()
            .map(|(field, direction)| {
                let left = lookup(Borrow::<Document>::borrow(a), field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);
                let right = lookup(Borrow::<Document>::borrow(b), field)
                    .map(Comparable::from)
                    .unwrap_or(Comparable::Null);

                match direction {
                    SortDirection::Asc => left.total_cmp(&right),
                    SortDirection::Desc => right.total_cmp(&left),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}
