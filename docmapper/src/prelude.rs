//! Convenient re-exports of commonly used types from docmapper.
//!
//! ```ignore
//! use docmapper::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model definitions and the registry
//! - Resources, embedded resources and their traits
//! - Query construction and filtering
//! - The adapter, driver traits and error types

pub use docmapper_core::{
    adapter::Adapter,
    driver::{Driver, DriverBuilder},
    embedded::{EmbeddedCollection, EmbeddedResource},
    embedment::EmbedValue,
    error::{MapperError, MapperResult},
    identifier::{Identifier, Reference},
    model::{Cardinality, ModelBuilder, Property, PropertyType, ScalarKind},
    query::{Criterion, Filter, Link, Query, QueryBuilder, Sort, SortDirection},
    registry::{Registry, RegistryBuilder},
    resource::{Persistable, Resource, StorageIdentity},
    value::Value,
};
