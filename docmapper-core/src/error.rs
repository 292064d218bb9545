//! Error types and result types for mapping and storage operations.
//!
//! Marshalling and translation failures are raised before any storage call is made,
//! so a failed operation never leaves a partial write behind. Driver failures are
//! surfaced as [`MapperError::Storage`] with the original error kept as the source.
//! Use [`MapperResult<T>`] as the return type for fallible operations.

use std::error::Error as StdError;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Boxed driver error carried by [`MapperError::Storage`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors raised by the mapping layer.
#[derive(Error, Debug)]
pub enum MapperError {
    /// A value cannot be cast or dumped to its logical type's storage representation.
    #[error("Validation error: {0}")]
    Validation(String),
    /// A condition or sort directive cannot be translated into a selector.
    #[error("Translation error: {0}")]
    Translation(String),
    /// A value of the wrong cardinality was assigned to an embedment.
    #[error("Embedment {embedment} expects {expected}, got {found}")]
    EmbedmentCardinality {
        /// Name of the embedment the value was assigned to.
        embedment: String,
        /// The cardinality the embedment declares.
        expected: &'static str,
        /// What was actually assigned.
        found: &'static str,
    },
    /// No stored document matches the identifier of the resource being loaded.
    #[error("{model} {id} not found")]
    NotFound {
        /// Name of the model that was looked up.
        model: String,
        /// Hex form of the identifier.
        id: String,
    },
    /// The storage driver failed. The driver's error is kept as the source.
    #[error("Storage error: {context}")]
    Storage {
        /// What the mapping layer was doing when the driver failed.
        context: String,
        /// The original driver error.
        #[source]
        source: BoxError,
    },
    /// A model, association or registry definition is invalid.
    #[error("Definition error: {0}")]
    Definition(String),
    /// Conversion between BSON, JSON and in-memory values failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MapperError {
    /// Wraps a driver error, keeping it as the error source.
    pub fn storage<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        MapperError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Builds a [`MapperError::NotFound`] for `model` and `id`.
    pub fn not_found(model: impl Into<String>, id: impl ToString) -> Self {
        MapperError::NotFound {
            model: model.into(),
            id: id.to_string(),
        }
    }
}

/// A specialized `Result` type for mapping operations.
pub type MapperResult<T> = Result<T, MapperError>;

impl From<BsonError> for MapperError {
    fn from(err: BsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for MapperError {
    fn from(err: SerdeJsonError) -> Self {
        MapperError::Serialization(err.to_string())
    }
}
