//! MongoDB driver implementation for docmapper.
//!
//! This crate provides a MongoDB-based implementation of the
//! [`Driver`](docmapper_core::driver::Driver) trait. Selectors produced by the
//! translator are handed to MongoDB unchanged; the server evaluates them.
//!
//! To use this driver, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmapper = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A connection string and database name are required. They can be passed to the
//! builder directly or deserialized into a [`MongoDbConfig`].
//!
//! # Example
//!
//! ```ignore
//! use docmapper::{driver::DriverBuilder, mongodb::MongoDbDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = MongoDbDriver::builder("mongodb://localhost:27017", "zoo")
//!         .app_name("zookeeper")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_mongodb;

pub mod config;
pub mod driver;

pub use config::MongoDbConfig;
pub use driver::{MongoDbDriver, MongoDbDriverBuilder};
