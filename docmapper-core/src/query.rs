//! Query construction API.
//!
//! Queries name properties, not storage fields. The
//! [`Translator`](crate::translate::Translator) resolves them against a model and
//! dumps operands through the property codecs.
//!
//! # Query Building
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! let query = Query::builder()
//!     .filter(Filter::gt("num_spots", 2))
//!     .filter(Filter::ne("num_spots", 3))
//!     .sort("name", SortDirection::Asc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! # Filter API
//!
//! [`Filter`] provides static constructors for every operator:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - Membership: `any_of`, `none_of`
//! - Pattern: `regex`, `regex_with_options`
//!
//! Criteria on the same property are conjunctive.

use crate::{condition::Operator, value::Value};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The storage form of the direction: `1` or `-1`.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Sort by one property.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// Property name, resolved to its storage field on translation.
    pub property: String,
    pub direction: SortDirection,
}

/// One predicate on a property, before translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    /// Property or embedment name.
    pub property: String,
    pub operator: Operator,
    pub operand: Value,
    /// Regex flags, only used with [`Operator::Regex`].
    pub options: Option<String>,
}

impl Criterion {
    /// Builds a criterion from its parts.
    pub fn new(property: impl Into<String>, operator: Operator, operand: impl Into<Value>) -> Self {
        Criterion {
            property: property.into(),
            operator,
            operand: operand.into(),
            options: None,
        }
    }
}

/// Helper for constructing criteria.
///
/// # Example
///
/// ```ignore
/// let heavy = Filter::gte("weight", 1000.0);
/// let named = Filter::regex_with_options("name", "john|jane", "i");
/// ```
pub struct Filter;

impl Filter {
    /// Matches when the property equals the value. Collection-typed properties compare
    /// deeply.
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Eq, value)
    }

    /// Not equal to.
    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Ne, value)
    }

    /// Greater than.
    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Gt, value)
    }

    /// Greater than or equal to.
    pub fn gte(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Gte, value)
    }

    /// Less than.
    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Lt, value)
    }

    /// Less than or equal to.
    pub fn lte(property: impl Into<String>, value: impl Into<Value>) -> Criterion {
        Criterion::new(property, Operator::Lte, value)
    }

    /// Matches when the property equals one of the values. On an embedded array this
    /// tests element membership.
    pub fn any_of<V: Into<Value>>(property: impl Into<String>, values: impl IntoIterator<Item = V>) -> Criterion {
        Criterion::new(property, Operator::In, Value::array(values))
    }

    /// Matches when the property equals none of the values.
    pub fn none_of<V: Into<Value>>(property: impl Into<String>, values: impl IntoIterator<Item = V>) -> Criterion {
        Criterion::new(property, Operator::NotIn, Value::array(values))
    }

    /// Matches string properties against a regular expression.
    pub fn regex(property: impl Into<String>, pattern: impl Into<String>) -> Criterion {
        Criterion::new(property, Operator::Regex, Value::String(pattern.into()))
    }

    /// Like [`Filter::regex`] with flags such as `i` for case-insensitive matching.
    pub fn regex_with_options(
        property: impl Into<String>,
        pattern: impl Into<String>,
        options: impl Into<String>,
    ) -> Criterion {
        Criterion {
            options: Some(options.into()),
            ..Filter::regex(property, pattern)
        }
    }
}

/// Restricts a query through an association: only resources related to a resource
/// matching `criteria` are returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Association name on the queried model.
    pub association: String,
    /// Conjunctive criteria on the associated model.
    pub criteria: Vec<Criterion>,
}

impl Link {
    /// Starts a link over the named association.
    pub fn new(association: impl Into<String>) -> Self {
        Link {
            association: association.into(),
            criteria: Vec::new(),
        }
    }

    /// Adds a criterion on the associated model.
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }
}

/// A structured query for retrieving resources of one model.
///
/// Use [`QueryBuilder`] for construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conjunctive criteria, in declaration order.
    pub criteria: Vec<Criterion>,
    /// Sort keys, applied in order.
    pub sort: Vec<Sort>,
    /// Maximum number of resources to return.
    pub limit: Option<usize>,
    /// Number of resources to skip.
    pub offset: usize,
    /// Association restrictions, resolved by the adapter before translation.
    pub links: Vec<Link>,
}

impl Query {
    /// Creates an empty query that matches everything.
    pub fn new() -> Self {
        Query::default()
    }

    /// Creates a [`QueryBuilder`].
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Shorthand for a query with only criteria.
    pub fn filtered(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Query {
            criteria: criteria.into_iter().collect(),
            ..Query::default()
        }
    }
}

/// Fluent builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a builder for an empty query.
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    /// Adds a criterion. Criteria are conjunctive.
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.query.criteria.push(criterion);
        self
    }

    /// Adds several criteria.
    pub fn filters(mut self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.query.criteria.extend(criteria);
        self
    }

    /// Sets the maximum number of resources to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of resources to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = offset;
        self
    }

    /// Appends a sort key. Earlier keys take precedence.
    pub fn sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort {
            property: property.into(),
            direction,
        });
        self
    }

    /// Restricts results to resources linked to matching associated resources.
    pub fn link(mut self, link: Link) -> Self {
        self.query.links.push(link);
        self
    }

    /// Finishes the query.
    pub fn build(self) -> Query {
        self.query
    }
}
