//! Storage identifiers and cross-document references.
//!
//! An [`Identifier`] wraps the storage engine's native 12-byte object id. It can be
//! generated locally, parsed from its 24 character hex form or built from raw bytes;
//! every route yields the same value, so an id typed in by a caller compares and
//! hashes equal to the id the store hands back.
//!
//! A [`Reference`] points at another document by identifier and, optionally, by
//! collection name. It is stored as a small nested document and never resolved by
//! itself.

use std::{fmt, str::FromStr};

use bson::{Bson, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{MapperError, MapperResult};

/// Opaque, storage-compatible unique identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(ObjectId);

impl Identifier {
    /// Length of the binary form.
    pub const BYTES: usize = 12;
    /// Length of the hex form.
    pub const HEX_LEN: usize = 24;

    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Identifier(ObjectId::new())
    }

    /// Builds an identifier from its canonical 12 raw bytes.
    pub fn from_bytes(bytes: [u8; Self::BYTES]) -> Self {
        Identifier(ObjectId::from_bytes(bytes))
    }

    /// Parses the 24 character hex form. Upper and lower case digits are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Validation`] when the input is not 24 hex digits.
    pub fn parse_str(hex: impl AsRef<str>) -> MapperResult<Self> {
        let hex = hex.as_ref();

        if hex.len() != Self::HEX_LEN {
            return Err(MapperError::Validation(format!(
                "identifier must be {} hex characters, got {:?}",
                Self::HEX_LEN,
                hex
            )));
        }

        ObjectId::parse_str(hex)
            .map(Identifier)
            .map_err(|e| MapperError::Validation(format!("malformed identifier {hex:?}: {e}")))
    }

    /// Returns the 12 raw bytes.
    pub fn bytes(&self) -> [u8; Self::BYTES] {
        self.0.bytes()
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Returns the native storage object id.
    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse_str(s)
    }
}

impl TryFrom<&[u8]> for Identifier {
    type Error = MapperError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; Identifier::BYTES]>::try_from(bytes)
            .map(Identifier::from_bytes)
            .map_err(|_| MapperError::Validation(format!(
                "identifier must be {} bytes, got {}",
                Identifier::BYTES,
                bytes.len()
            )))
    }
}

impl From<ObjectId> for Identifier {
    fn from(oid: ObjectId) -> Self {
        Identifier(oid)
    }
}

impl From<Identifier> for ObjectId {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl From<Identifier> for Bson {
    fn from(id: Identifier) -> Self {
        Bson::ObjectId(id.0)
    }
}

/// A typed pointer to another document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Identifier of the referenced document.
    pub target_id: Identifier,
    /// Collection holding the referenced document, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_collection: Option<String>,
}

impl Reference {
    /// Wire field holding the target identifier.
    pub const TARGET_ID: &'static str = "target_id";
    /// Wire field holding the target collection.
    pub const TARGET_COLLECTION: &'static str = "target_collection";

    /// Points at `target_id` without naming a collection.
    pub fn new(target_id: Identifier) -> Self {
        Reference {
            target_id,
            target_collection: None,
        }
    }

    /// Points at `target_id` in `collection`.
    pub fn with_collection(target_id: Identifier, collection: impl Into<String>) -> Self {
        Reference {
            target_id,
            target_collection: Some(collection.into()),
        }
    }

    /// Renders the wire form `{ target_id, target_collection? }`.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(Self::TARGET_ID, self.target_id);

        if let Some(collection) = &self.target_collection {
            document.insert(Self::TARGET_COLLECTION, collection.clone());
        }

        document
    }

    /// Reads the wire form back. The target id may be a native object id or its hex
    /// form. Any other key makes the document something other than a reference.
    pub fn from_document(document: &Document) -> Option<Reference> {
        let target_id = match document.get(Self::TARGET_ID)? {
            Bson::ObjectId(oid) => Identifier::from(*oid),
            Bson::String(hex) => Identifier::parse_str(hex).ok()?,
            _ => return None,
        };

        let target_collection = match document.get(Self::TARGET_COLLECTION) {
            None | Some(Bson::Null) => None,
            Some(Bson::String(name)) => Some(name.clone()),
            Some(_) => return None,
        };

        let known = document
            .keys()
            .all(|k| k == Self::TARGET_ID || k == Self::TARGET_COLLECTION);

        known.then_some(Reference {
            target_id,
            target_collection,
        })
    }
}

impl From<Identifier> for Reference {
    fn from(id: Identifier) -> Self {
        Reference::new(id)
    }
}

impl PartialEq<Identifier> for Reference {
    fn eq(&self, other: &Identifier) -> bool {
        &self.target_id == other
    }
}

impl PartialEq<Reference> for Identifier {
    fn eq(&self, other: &Reference) -> bool {
        self == &other.target_id
    }
}
