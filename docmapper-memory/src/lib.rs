//! In-memory storage driver for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`Driver`](docmapper_core::driver::Driver) trait. Selectors are evaluated in
//! process with the same matching rules the core uses for embedded collections, so
//! results line up with what a document database would return for the same query.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::MemoryDriver};
//!
//! #[tokio::main]
//! async fn main() -> MapperResult<()> {
//!     let registry = Registry::builder()
//!         .define(ModelBuilder::new("Heffalump").property(Property::new("color", PropertyType::STRING)))
//!         .build()?;
//!     let adapter = Adapter::new(registry.clone(), MemoryDriver::new());
//!
//!     let mut red = Resource::new(&registry, "Heffalump")?.with("color", "red")?;
//!     adapter.create(&mut red).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod driver;

pub use driver::{MemoryDriver, MemoryDriverBuilder};
