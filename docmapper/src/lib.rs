//! Main docmapper crate providing a document-store object mapper.
//!
//! This crate is the primary entry point for users of docmapper. It re-exports the
//! core types from `docmapper-core` and gives access to the storage drivers.
//!
//! # Features
//!
//! - **Typed properties** - Scalars, identifiers, references and nested arrays/maps with per-type codecs
//! - **Embedded resources** - One-to-one and one-to-many sub-documents persisted with their parent
//! - **Query translation** - Composable filters translated into document-store selectors
//! - **Associations** - `belongs_to` / `has_many` through reference properties, plus query links
//! - **Multiple drivers** - In-memory and MongoDB storage behind one async trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::MemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> MapperResult<()> {
//!     let registry = Registry::builder()
//!         .define(
//!             ModelBuilder::new("Heffalump")
//!                 .property(Property::new("color", PropertyType::STRING))
//!                 .property(Property::new("num_spots", PropertyType::INTEGER)),
//!         )
//!         .build()?;
//!
//!     let adapter = Adapter::new(registry.clone(), MemoryDriver::new());
//!
//!     for spots in [2, 3, 5] {
//!         let mut heffalump = Resource::new(&registry, "Heffalump")?
//!             .with("color", "blue")?
//!             .with("num_spots", spots)?;
//!         adapter.create(&mut heffalump).await?;
//!     }
//!
//!     let spotted = adapter
//!         .read(
//!             "Heffalump",
//!             &Query::filtered([Filter::gt("num_spots", 2), Filter::ne("num_spots", 3)]),
//!         )
//!         .await?;
//!     assert_eq!(spotted.len(), 1);
//!
//!     adapter.into_driver().shutdown().await
//! }
//! ```
//!
//! # Embedded resources
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! let registry = Registry::builder()
//!     .define(ModelBuilder::new("Zoo").embeds_many("keepers", "Keeper"))
//!     .define(ModelBuilder::embedded("Keeper").property(Property::new("name", PropertyType::STRING)))
//!     .build()?;
//!
//! let mut zoo = Resource::new(&registry, "Zoo")?;
//! let alex = EmbeddedResource::new(&registry, "Keeper")?.with("name", "Alex")?;
//! zoo.embedded_many_mut("keepers")?.push(alex)?;
//! adapter.save(&mut zoo).await?;
//! ```
//!
//! # Drivers
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB storage (requires the `mongodb` feature)

pub mod prelude;

pub use docmapper_core::{
    adapter, association, codec, condition, driver, embedded, embedment, error, identifier, model, query,
    registry, resource, selector, translate, value,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage driver.
pub mod memory {
    pub use docmapper_memory::{MemoryDriver, MemoryDriverBuilder};
}

/// MongoDB storage driver.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmapper_mongodb::{MongoDbConfig, MongoDbDriver, MongoDbDriverBuilder};
}
