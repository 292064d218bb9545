//! A document-store object mapper with typed properties, query translation and embedded resources.
//!
//! This crate is the core of the docmapper project and provides:
//!
//! - **Values and identifiers** ([`value`], [`identifier`]) - In-memory values and storage identity
//! - **Model metadata** ([`model`], [`registry`]) - Properties, embedments and associations
//! - **Type codecs** ([`codec`]) - Typecasting and storage conversion per logical type
//! - **Resources** ([`resource`], [`embedded`]) - Attribute sets with dirty tracking
//! - **Queries** ([`query`], [`condition`], [`translate`]) - Criteria and their storage selectors
//! - **Selector evaluation** ([`selector`]) - Matching and sorting documents in process
//! - **Drivers and the adapter** ([`driver`], [`adapter`], [`association`]) - Persistence
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmapper_core::{model::{ModelBuilder, Property, PropertyType}, registry::Registry};
//!
//! let registry = Registry::builder()
//!     .define(
//!         ModelBuilder::new("Heffalump")
//!             .property(Property::new("color", PropertyType::STRING))
//!             .property(Property::new("num_spots", PropertyType::INTEGER)),
//!     )
//!     .build()?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod adapter;
pub mod association;
pub mod codec;
pub mod condition;
pub mod driver;
pub mod embedded;
pub mod embedment;
pub mod error;
pub mod identifier;
pub mod model;
pub mod query;
pub mod registry;
pub mod resource;
pub mod selector;
pub mod translate;
pub mod value;

pub use adapter::Adapter;
pub use driver::{Driver, DriverBuilder};
pub use embedded::{EmbeddedCollection, EmbeddedResource};
pub use embedment::EmbedValue;
pub use error::{MapperError, MapperResult};
pub use identifier::{Identifier, Reference};
pub use query::{Filter, Link, Query, SortDirection};
pub use registry::Registry;
pub use resource::{Persistable, Resource, StorageIdentity};
pub use value::Value;
