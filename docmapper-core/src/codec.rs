//! Property type marshalling.
//!
//! Every [`PropertyType`] owns a [`TypeCodec`] that casts caller input into the
//! canonical in-memory [`Value`], dumps it to its storage form and loads it back.
//! Codecs are picked from a static table keyed on the logical type, so dispatch never
//! inspects the runtime shape of a value.
//!
//! Null is handled here rather than by each codec: it always dumps to BSON null and
//! a null or missing field always loads as [`Value::Null`].
//!
//! The collection codecs recurse through [`dump_element`] and [`load_element`], which
//! keep typed elements typed: identifiers stay object ids, references stay reference
//! documents, timestamps stay native dates.

use std::collections::BTreeMap;

use bson::{Binary, Bson, DateTime as BsonDateTime, Document, spec::BinarySubtype};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    condition::Operator,
    error::{MapperError, MapperResult},
    identifier::{Identifier, Reference},
    model::{PropertyType, ScalarKind},
    value::Value,
};

/// Dump/load pair defining a logical type's storage representation.
pub trait TypeCodec: Send + Sync {
    /// Human readable name of the logical type.
    fn name(&self) -> &'static str;

    /// Normalises a non-null caller value into the canonical in-memory form.
    fn typecast(&self, value: Value) -> MapperResult<Value>;

    /// Dumps a non-null value. The value is cast first, so any input accepted by
    /// [`TypeCodec::typecast`] is accepted here.
    fn dump(&self, value: &Value) -> MapperResult<Bson>;

    /// Loads a non-null storage value.
    fn load(&self, bson: &Bson) -> MapperResult<Value>;

    /// Whether conditions may use `operator` against this type.
    fn supports(&self, operator: Operator) -> bool;
}

static STRING: ScalarCodec = ScalarCodec(ScalarKind::String);
static INTEGER: ScalarCodec = ScalarCodec(ScalarKind::Integer);
static FLOAT: ScalarCodec = ScalarCodec(ScalarKind::Float);
static BOOLEAN: ScalarCodec = ScalarCodec(ScalarKind::Boolean);
static DATETIME: ScalarCodec = ScalarCodec(ScalarKind::DateTime);
static UUID: ScalarCodec = ScalarCodec(ScalarKind::Uuid);
static IDENTIFIER: IdentifierCodec = IdentifierCodec;
static REFERENCE: ReferenceCodec = ReferenceCodec;
static EMBEDDED_ARRAY: EmbeddedArrayCodec = EmbeddedArrayCodec;
static EMBEDDED_MAP: EmbeddedMapCodec = EmbeddedMapCodec;

impl PropertyType {
    /// The codec implementing this logical type.
    pub fn codec(&self) -> &'static dyn TypeCodec {
        match self {
            PropertyType::Scalar(ScalarKind::String) => &STRING,
            PropertyType::Scalar(ScalarKind::Integer) => &INTEGER,
            PropertyType::Scalar(ScalarKind::Float) => &FLOAT,
            PropertyType::Scalar(ScalarKind::Boolean) => &BOOLEAN,
            PropertyType::Scalar(ScalarKind::DateTime) => &DATETIME,
            PropertyType::Scalar(ScalarKind::Uuid) => &UUID,
            PropertyType::Identifier => &IDENTIFIER,
            PropertyType::Reference => &REFERENCE,
            PropertyType::EmbeddedArray => &EMBEDDED_ARRAY,
            PropertyType::EmbeddedMap => &EMBEDDED_MAP,
        }
    }
}

/// Casts a caller value for a property of `kind`. Null passes through.
pub fn typecast(kind: PropertyType, value: Value) -> MapperResult<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        value => kind.codec().typecast(value),
    }
}

/// Dumps a value of logical type `kind` to its storage form.
pub fn dump(kind: PropertyType, value: &Value) -> MapperResult<Bson> {
    match value {
        Value::Null => Ok(Bson::Null),
        value => kind.codec().dump(value),
    }
}

/// Loads a storage value of logical type `kind`. A missing field loads as null.
pub fn load(kind: PropertyType, bson: Option<&Bson>) -> MapperResult<Value> {
    match bson {
        None | Some(Bson::Null) | Some(Bson::Undefined) => Ok(Value::Null),
        Some(bson) => kind.codec().load(bson),
    }
}

fn cast_error(codec: &dyn TypeCodec, value: &Value) -> MapperError {
    MapperError::Validation(format!("cannot use a {} value as {}", value.kind_name(), codec.name()))
}

fn load_error(codec: &dyn TypeCodec, bson: &Bson) -> MapperError {
    MapperError::Serialization(format!("cannot load {:?} as {}", bson.element_type(), codec.name()))
}

fn uuid_to_bson(uuid: &Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Uuid,
        bytes: uuid.as_bytes().to_vec(),
    })
}

fn uuid_from_binary(binary: &Binary) -> Option<Uuid> {
    match binary.subtype {
        BinarySubtype::Uuid | BinarySubtype::UuidOld => Uuid::from_slice(&binary.bytes).ok(),
        _ => None,
    }
}

fn datetime_to_bson(datetime: &DateTime<Utc>) -> Bson {
    Bson::DateTime(BsonDateTime::from_chrono(*datetime))
}

/// Rejects keys the storage engine reserves for operators and paths.
pub(crate) fn check_key(key: &str) -> MapperResult<()> {
    if key.starts_with('$') || key.contains('.') || key.contains('\0') {
        return Err(MapperError::Validation(format!(
            "map key {key:?} cannot start with '$' or contain '.'"
        )));
    }
    Ok(())
}

fn map_to_document(map: &BTreeMap<String, Value>) -> MapperResult<Document> {
    let mut document = Document::new();
    for (key, value) in map {
        check_key(key)?;
        document.insert(key.clone(), dump_element(value)?);
    }
    Ok(document)
}

/// Dumps a value whose logical type is not declared: an element of an embedded array
/// or map. Typed values keep their storage types.
///
/// A plain map shaped like a reference would load back as a [`Value::Reference`], so
/// it is rejected; store a reference value instead.
pub fn dump_element(value: &Value) -> MapperResult<Bson> {
    Ok(match value {
        Value::Null => Bson::Null,
        Value::Boolean(b) => Bson::Boolean(*b),
        Value::Integer(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::DateTime(dt) => datetime_to_bson(dt),
        Value::Uuid(uuid) => uuid_to_bson(uuid),
        Value::Identifier(id) => Bson::from(*id),
        Value::Reference(reference) => Bson::Document(reference.to_document()),
        Value::Array(items) => Bson::Array(items.iter().map(dump_element).collect::<MapperResult<_>>()?),
        Value::Map(map) => {
            let document = map_to_document(map)?;
            if Reference::from_document(&document).is_some() {
                return Err(MapperError::Validation(format!(
                    "map with keys {:?} has the shape of a reference",
                    map.keys().collect::<Vec<_>>()
                )));
            }
            Bson::Document(document)
        },
    })
}

/// Loads an untyped nested storage value. Documents shaped like a reference
/// (`target_id` plus optional `target_collection`, nothing else) load as
/// [`Value::Reference`].
pub fn load_element(bson: &Bson) -> MapperResult<Value> {
    Ok(match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Boolean(*b),
        Bson::Int32(i) => Value::Integer((*i).into()),
        Bson::Int64(i) => Value::Integer(*i),
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) => Value::String(s.clone()),
        Bson::DateTime(dt) => Value::DateTime(dt.to_chrono()),
        Bson::ObjectId(oid) => Value::Identifier(Identifier::from(*oid)),
        Bson::Binary(binary) => match uuid_from_binary(binary) {
            Some(uuid) => Value::Uuid(uuid),
            None => {
                return Err(MapperError::Serialization(format!(
                    "unsupported binary subtype {:?}",
                    binary.subtype
                )));
            },
        },
        Bson::Array(items) => Value::Array(items.iter().map(load_element).collect::<MapperResult<_>>()?),
        Bson::Document(document) => match Reference::from_document(document) {
            Some(reference) => Value::Reference(reference),
            None => Value::Map(
                document
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), load_element(v)?)))
                    .collect::<MapperResult<_>>()?
            ),
        },
        other => {
            return Err(MapperError::Serialization(format!(
                "unsupported storage value of type {:?}",
                other.element_type()
            )));
        },
    })
}

/// Codec for primitive scalars.
#[derive(Debug, Clone, Copy)]
pub struct ScalarCodec(pub ScalarKind);

impl TypeCodec for ScalarCodec {
    fn name(&self) -> &'static str {
        match self.0 {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Uuid => "uuid",
        }
    }

    fn typecast(&self, value: Value) -> MapperResult<Value> {
        match (self.0, value) {
            (ScalarKind::String, value @ Value::String(_)) => Ok(value),
            (ScalarKind::Integer, value @ Value::Integer(_)) => Ok(value),
            (ScalarKind::Float, value @ Value::Float(_)) => Ok(value),
            (ScalarKind::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (ScalarKind::Boolean, value @ Value::Boolean(_)) => Ok(value),
            (ScalarKind::DateTime, Value::DateTime(dt)) => Ok(Value::datetime(dt)),
            (ScalarKind::DateTime, Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Value::datetime(dt.with_timezone(&Utc)))
                .map_err(|e| MapperError::Validation(format!("invalid timestamp {s:?}: {e}"))),
            (ScalarKind::Uuid, value @ Value::Uuid(_)) => Ok(value),
            (ScalarKind::Uuid, Value::String(s)) => Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| MapperError::Validation(format!("invalid uuid {s:?}: {e}"))),
            (_, value) => Err(cast_error(self, &value)),
        }
    }

    fn dump(&self, value: &Value) -> MapperResult<Bson> {
        Ok(match self.typecast(value.clone())? {
            Value::String(s) => Bson::String(s),
            Value::Integer(i) => Bson::Int64(i),
            Value::Float(f) => Bson::Double(f),
            Value::Boolean(b) => Bson::Boolean(b),
            Value::DateTime(dt) => datetime_to_bson(&dt),
            Value::Uuid(uuid) => uuid_to_bson(&uuid),
            other => return Err(cast_error(self, &other)),
        })
    }

    fn load(&self, bson: &Bson) -> MapperResult<Value> {
        match (self.0, bson) {
            (ScalarKind::String, Bson::String(s)) => Ok(Value::String(s.clone())),
            (ScalarKind::Integer, Bson::Int32(i)) => Ok(Value::Integer((*i).into())),
            (ScalarKind::Integer, Bson::Int64(i)) => Ok(Value::Integer(*i)),
            (ScalarKind::Integer, Bson::Double(f)) if f.fract() == 0.0 => Ok(Value::Integer(*f as i64)),
            (ScalarKind::Float, Bson::Double(f)) => Ok(Value::Float(*f)),
            (ScalarKind::Float, Bson::Int32(i)) => Ok(Value::Float((*i).into())),
            (ScalarKind::Float, Bson::Int64(i)) => Ok(Value::Float(*i as f64)),
            (ScalarKind::Boolean, Bson::Boolean(b)) => Ok(Value::Boolean(*b)),
            (ScalarKind::DateTime, Bson::DateTime(dt)) => Ok(Value::DateTime(dt.to_chrono())),
            (ScalarKind::Uuid, Bson::Binary(binary)) => uuid_from_binary(binary)
                .map(Value::Uuid)
                .ok_or_else(|| load_error(self, bson)),
            (ScalarKind::Uuid, Bson::String(s)) => Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|_| load_error(self, bson)),
            _ => Err(load_error(self, bson)),
        }
    }

    fn supports(&self, operator: Operator) -> bool {
        match self.0 {
            ScalarKind::String => true,
            ScalarKind::Integer | ScalarKind::Float | ScalarKind::DateTime => operator != Operator::Regex,
            ScalarKind::Boolean | ScalarKind::Uuid => operator.is_equality() || operator.is_membership(),
        }
    }
}

/// Codec for storage identifiers. Accepts the native object id and its hex form.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierCodec;

impl TypeCodec for IdentifierCodec {
    fn name(&self) -> &'static str {
        "identifier"
    }

    fn typecast(&self, value: Value) -> MapperResult<Value> {
        match value {
            value @ Value::Identifier(_) => Ok(value),
            Value::String(hex) => Identifier::parse_str(hex).map(Value::Identifier),
            other => Err(cast_error(self, &other)),
        }
    }

    fn dump(&self, value: &Value) -> MapperResult<Bson> {
        match self.typecast(value.clone())? {
            Value::Identifier(id) => Ok(Bson::from(id)),
            other => Err(cast_error(self, &other)),
        }
    }

    fn load(&self, bson: &Bson) -> MapperResult<Value> {
        match bson {
            Bson::ObjectId(oid) => Ok(Value::Identifier(Identifier::from(*oid))),
            Bson::String(hex) => Identifier::parse_str(hex)
                .map(Value::Identifier)
                .map_err(|_| load_error(self, bson)),
            _ => Err(load_error(self, bson)),
        }
    }

    fn supports(&self, operator: Operator) -> bool {
        operator != Operator::Regex
    }
}

/// Codec for cross-document references. Bare identifiers are promoted to references
/// without a collection.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceCodec;

impl TypeCodec for ReferenceCodec {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn typecast(&self, value: Value) -> MapperResult<Value> {
        match value {
            value @ Value::Reference(_) => Ok(value),
            Value::Identifier(id) => Ok(Value::Reference(Reference::new(id))),
            Value::String(hex) => Identifier::parse_str(hex).map(|id| Value::Reference(Reference::new(id))),
            Value::Map(map) => Reference::from_document(&map_to_document(&map)?)
                .map(Value::Reference)
                .ok_or_else(|| MapperError::Validation("map is not a reference".into())),
            other => Err(cast_error(self, &other)),
        }
    }

    fn dump(&self, value: &Value) -> MapperResult<Bson> {
        match self.typecast(value.clone())? {
            Value::Reference(reference) => Ok(Bson::Document(reference.to_document())),
            other => Err(cast_error(self, &other)),
        }
    }

    fn load(&self, bson: &Bson) -> MapperResult<Value> {
        match bson {
            Bson::Document(document) => Reference::from_document(document)
                .map(Value::Reference)
                .ok_or_else(|| load_error(self, bson)),
            Bson::ObjectId(oid) => Ok(Value::Reference(Reference::new(Identifier::from(*oid)))),
            Bson::String(hex) => Identifier::parse_str(hex)
                .map(|id| Value::Reference(Reference::new(id)))
                .map_err(|_| load_error(self, bson)),
            _ => Err(load_error(self, bson)),
        }
    }

    fn supports(&self, operator: Operator) -> bool {
        operator.is_equality() || operator.is_membership()
    }
}

/// Codec for ordered sequences stored verbatim.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedArrayCodec;

impl TypeCodec for EmbeddedArrayCodec {
    fn name(&self) -> &'static str {
        "embedded array"
    }

    fn typecast(&self, value: Value) -> MapperResult<Value> {
        match value {
            Value::Array(items) => {
                let value = Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::DateTime(dt) => Value::datetime(dt),
                            item => item,
                        })
                        .collect()
                );
                dump_element(&value)?;
                Ok(value)
            },
            other => Err(cast_error(self, &other)),
        }
    }

    fn dump(&self, value: &Value) -> MapperResult<Bson> {
        match value {
            Value::Array(_) => dump_element(value),
            other => Err(cast_error(self, other)),
        }
    }

    fn load(&self, bson: &Bson) -> MapperResult<Value> {
        match bson {
            Bson::Array(_) => load_element(bson),
            _ => Err(load_error(self, bson)),
        }
    }

    fn supports(&self, operator: Operator) -> bool {
        operator.is_equality() || operator.is_membership()
    }
}

/// Codec for string-keyed mappings stored verbatim as nested documents.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedMapCodec;

impl TypeCodec for EmbeddedMapCodec {
    fn name(&self) -> &'static str {
        "embedded map"
    }

    fn typecast(&self, value: Value) -> MapperResult<Value> {
        match value {
            value @ Value::Map(_) => {
                dump_element(&value)?;
                Ok(value)
            },
            other => Err(cast_error(self, &other)),
        }
    }

    fn dump(&self, value: &Value) -> MapperResult<Bson> {
        match value {
            Value::Map(_) => dump_element(value),
            other => Err(cast_error(self, other)),
        }
    }

    fn load(&self, bson: &Bson) -> MapperResult<Value> {
        match bson {
            Bson::Document(document) => Ok(Value::Map(
                document
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), load_element(v)?)))
                    .collect::<MapperResult<_>>()?
            )),
            _ => Err(load_error(self, bson)),
        }
    }

    fn supports(&self, operator: Operator) -> bool {
        operator.is_equality()
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use chrono::TimeZone;

    use super::*;

    fn round_trip(kind: PropertyType, value: Value) {
        let dumped = dump(kind, &value).unwrap();
        let loaded = load(kind, Some(&dumped)).unwrap();
        assert_eq!(loaded, value, "{kind:?} did not round trip through {dumped:?}");
    }

    #[test]
    fn every_logical_type_round_trips() {
        let id = Identifier::new();
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();

        round_trip(PropertyType::STRING, Value::from("red"));
        round_trip(PropertyType::INTEGER, Value::Integer(-42));
        round_trip(PropertyType::FLOAT, Value::Float(2.5));
        round_trip(PropertyType::BOOLEAN, Value::Boolean(true));
        round_trip(PropertyType::DATETIME, Value::DateTime(at));
        round_trip(PropertyType::UUID, Value::Uuid(Uuid::new_v4()));
        round_trip(PropertyType::Identifier, Value::Identifier(id));
        round_trip(PropertyType::Reference, Value::Reference(Reference::new(id)));
        round_trip(PropertyType::Reference, Value::Reference(Reference::with_collection(id, "groups")));
        round_trip(PropertyType::EmbeddedArray, Value::array(["marty", "alex", "gloria"]));
        round_trip(PropertyType::EmbeddedMap, Value::map([("street", "Street 1")]));

        round_trip(
            PropertyType::EmbeddedMap,
            Value::map([("owner", Value::Reference(Reference::with_collection(id, "users")))]),
        );
        round_trip(
            PropertyType::EmbeddedMap,
            Value::map([("owner", Value::map([("target_id", Value::Identifier(id)), ("role", Value::from("admin"))]))]),
        );

        for kind in [PropertyType::STRING, PropertyType::Reference, PropertyType::EmbeddedMap] {
            round_trip(kind, Value::Null);
        }
    }

    #[test]
    fn reference_shaped_maps_are_rejected() {
        let id = Identifier::new();
        let shaped = [
            Value::map([("target_id", Value::from(id.to_hex()))]),
            Value::map([("target_id", Value::Identifier(id)), ("target_collection", Value::from("users"))]),
        ];

        for map in shaped {
            let nested = Value::map([("owner", map.clone())]);
            assert!(matches!(
                typecast(PropertyType::EmbeddedMap, nested.clone()),
                Err(MapperError::Validation(_))
            ));
            assert!(matches!(
                dump(PropertyType::EmbeddedMap, &nested),
                Err(MapperError::Validation(_))
            ));
            assert!(matches!(
                typecast(PropertyType::EmbeddedArray, Value::array([map])),
                Err(MapperError::Validation(_))
            ));
        }

        assert_eq!(
            typecast(PropertyType::Reference, Value::map([("target_id", Value::Identifier(id))])).unwrap(),
            Value::Reference(Reference::new(id))
        );
    }

    #[test]
    fn nested_typed_values_keep_their_types() {
        let id = Identifier::new();
        let at = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        let value = Value::map([
            ("owner", Value::Identifier(id)),
            ("group", Value::Reference(Reference::with_collection(id, "groups"))),
            ("opened", Value::DateTime(at)),
            ("tags", Value::array([Value::Identifier(id), Value::from("x")])),
            ("nested", Value::map([("deep", Value::array([Value::map([("n", 1)])]))])),
        ]);

        let dumped = dump(PropertyType::EmbeddedMap, &value).unwrap();
        let document = dumped.as_document().unwrap();

        assert_eq!(document.get("owner"), Some(&Bson::ObjectId(id.as_object_id())));
        assert!(matches!(document.get("opened"), Some(Bson::DateTime(_))));
        assert_eq!(
            document.get_document("group").unwrap(),
            &doc! { "target_id": id.as_object_id(), "target_collection": "groups" }
        );
        assert_eq!(
            document.get_array("tags").unwrap()[0],
            Bson::ObjectId(id.as_object_id())
        );

        assert_eq!(load(PropertyType::EmbeddedMap, Some(&dumped)).unwrap(), value);
    }

    #[test]
    fn identifier_codec_accepts_native_and_hex_forms() {
        let oid = ObjectId::new();
        let native = load(PropertyType::Identifier, Some(&Bson::ObjectId(oid))).unwrap();
        let hex = load(PropertyType::Identifier, Some(&Bson::String(oid.to_hex()))).unwrap();

        assert_eq!(native, hex);
        assert_eq!(
            dump(PropertyType::Identifier, &Value::from(oid.to_hex())).unwrap(),
            Bson::ObjectId(oid)
        );
    }

    #[test]
    fn malformed_identifier_input_is_a_validation_error() {
        let err = dump(PropertyType::Identifier, &Value::from("not-an-id")).unwrap_err();
        assert!(matches!(err, MapperError::Validation(_)));

        let err = typecast(PropertyType::Reference, Value::from("xyz")).unwrap_err();
        assert!(matches!(err, MapperError::Validation(_)));
    }

    #[test]
    fn reference_codec_promotes_identifiers() {
        let id = Identifier::new();

        assert_eq!(
            typecast(PropertyType::Reference, Value::Identifier(id)).unwrap(),
            Value::Reference(Reference::new(id))
        );
        assert_eq!(
            load(PropertyType::Reference, Some(&Bson::ObjectId(id.as_object_id()))).unwrap(),
            Value::Reference(Reference::new(id))
        );
    }

    #[test]
    fn scalar_casts_are_strict() {
        assert_eq!(typecast(PropertyType::FLOAT, Value::Integer(3)).unwrap(), Value::Float(3.0));
        assert!(matches!(
            typecast(PropertyType::INTEGER, Value::from("3")),
            Err(MapperError::Validation(_))
        ));
        assert!(matches!(
            typecast(PropertyType::EmbeddedArray, Value::map([("a", 1)])),
            Err(MapperError::Validation(_))
        ));
        assert_eq!(
            load(PropertyType::INTEGER, Some(&Bson::Int32(7))).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn reserved_map_keys_are_rejected() {
        for key in ["$where", "a.b"] {
            let err = dump(PropertyType::EmbeddedMap, &Value::map([(key, 1)])).unwrap_err();
            assert!(matches!(err, MapperError::Validation(_)));
        }
    }

    #[test]
    fn missing_fields_load_as_null() {
        assert_eq!(load(PropertyType::STRING, None).unwrap(), Value::Null);
        assert_eq!(load(PropertyType::EmbeddedArray, Some(&Bson::Null)).unwrap(), Value::Null);
    }

    #[test]
    fn operator_support_follows_the_type() {
        assert!(PropertyType::STRING.codec().supports(Operator::Regex));
        assert!(!PropertyType::INTEGER.codec().supports(Operator::Regex));
        assert!(PropertyType::INTEGER.codec().supports(Operator::Gt));
        assert!(!PropertyType::BOOLEAN.codec().supports(Operator::Gt));
        assert!(!PropertyType::Reference.codec().supports(Operator::Lt));
        assert!(PropertyType::EmbeddedArray.codec().supports(Operator::In));
        assert!(!PropertyType::EmbeddedMap.codec().supports(Operator::In));
    }
}
