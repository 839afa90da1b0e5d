//! Reader side of the JSON mapping.
//!
//! Mirrors the writer: reversible variants come back with their exact type,
//! bare (non-reversible) values are inferred from the JSON kind and are
//! therefore lossy: integers become Int32/Int64/UInt64 by range, other
//! numbers Double, and 64-bit integers written as strings come back as
//! strings.

use std::cell::RefCell;
use std::fmt;

use base64::Engine;
use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::error::{PubSubError, Result};
use crate::json::field::FieldEncoding;
use crate::mask::DataSetFieldContentMask;
use crate::types::{DataValue, DateTime, StatusCode, Variant, VariantType};

/// Parse a whole document into a [`Value`], rejecting repeated object keys.
///
/// `serde_json::Value` keeps only the last of two equal keys, which would
/// silently overwrite a payload field. The first repeated key found is
/// reported as `DuplicateField`.
pub fn parse_document(text: &str) -> Result<Value> {
    let duplicate = RefCell::new(None);
    let mut de = serde_json::Deserializer::from_str(text);
    let parsed = UniqueKeys { duplicate: &duplicate }
        .deserialize(&mut de)
        .and_then(|v| de.end().map(|()| v));
    match (parsed, duplicate.into_inner()) {
        (Ok(v), _) => Ok(v),
        (Err(_), Some(key)) => {
            tracing::debug!(field = %key, "duplicate key in document");
            Err(PubSubError::DuplicateField(key))
        }
        (Err(e), None) => Err(PubSubError::decode(format!("invalid json: {e}"))),
    }
}

#[derive(Clone, Copy)]
struct UniqueKeys<'a> {
    duplicate: &'a RefCell<Option<String>>,
}

impl<'de> DeserializeSeed<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for UniqueKeys<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Value, D::Error> {
        self.deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(v) = seq.next_element_seed(self)? {
            items.push(v);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut obj = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if obj.contains_key(&key) {
                let msg = format!("duplicate key {key:?}");
                *self.duplicate.borrow_mut() = Some(key);
                return Err(de::Error::custom(msg));
            }
            let v = map.next_value_seed(self)?;
            obj.insert(key, v);
        }
        Ok(Value::Object(obj))
    }
}

/// Inverse of [`crate::json::write_field`].
pub fn read_field(v: &Value, mask: DataSetFieldContentMask) -> Result<DataValue> {
    match FieldEncoding::for_mask(mask) {
        FieldEncoding::Variant => Ok(DataValue::new(read_variant(v, true)?)),
        FieldEncoding::RawData => Ok(DataValue::new(read_bare(v)?)),
        FieldEncoding::DataValue { reversible } => read_data_value(v, reversible),
    }
}

pub fn read_variant(v: &Value, reversible: bool) -> Result<Variant> {
    if !reversible {
        return read_bare(v);
    }
    if v.is_null() {
        return Ok(Variant::Null);
    }
    let obj = as_object(v, "reversible variant")?;
    let id = obj
        .get("Type")
        .and_then(Value::as_u64)
        .ok_or_else(|| PubSubError::decode("reversible variant without numeric Type"))?;
    let ty = u8::try_from(id)
        .ok()
        .and_then(VariantType::from_id)
        .ok_or_else(|| PubSubError::decode(format!("unsupported variant type id {id}")))?;
    match obj.get("Body") {
        None | Some(Value::Null) => Ok(Variant::Null),
        Some(Value::Array(items)) => {
            let values = items
                .iter()
                .map(|item| read_scalar(ty, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Variant::Array(ty, values))
        }
        Some(body) => read_scalar(ty, body),
    }
}

/// Infer a variant from a bare JSON value.
pub fn read_bare(v: &Value) -> Result<Variant> {
    match v {
        Value::Null => Ok(Variant::Null),
        Value::Bool(b) => Ok(Variant::Boolean(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i32::try_from(i).map(Variant::Int32).unwrap_or(Variant::Int64(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Variant::UInt64(u))
            } else {
                Ok(Variant::Double(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Ok(Variant::String(s.clone())),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(PubSubError::decode("cannot infer the element type of an empty bare array"));
            }
            let values = items.iter().map(read_bare).collect::<Result<Vec<_>>>()?;
            Variant::array(values).map_err(|e| PubSubError::decode(e.to_string()))
        }
        Value::Object(_) => Err(PubSubError::decode("structured bare values are not supported")),
    }
}

pub fn read_data_value(v: &Value, reversible: bool) -> Result<DataValue> {
    let obj = as_object(v, "DataValue")?;
    let mut dv = DataValue::new(match obj.get("Value") {
        Some(value) => read_variant(value, reversible)?,
        None => Variant::Null,
    });
    if let Some(s) = obj.get("Status") {
        dv.status = Some(read_status_code(s)?);
    }
    if let Some(ts) = obj.get("SourceTimestamp") {
        dv.source_timestamp = Some(read_date_time(ts)?);
    }
    if let Some(ps) = obj.get("SourcePicoseconds") {
        dv.source_picoseconds = Some(read_uint(ps, "SourcePicoseconds")?);
    }
    if let Some(ts) = obj.get("ServerTimestamp") {
        dv.server_timestamp = Some(read_date_time(ts)?);
    }
    if let Some(ps) = obj.get("ServerPicoseconds") {
        dv.server_picoseconds = Some(read_uint(ps, "ServerPicoseconds")?);
    }
    Ok(dv)
}

/// Accepts both the numeric and the `{"Code":..}` form; `null` is Good.
pub fn read_status_code(v: &Value) -> Result<StatusCode> {
    match v {
        Value::Null => Ok(StatusCode::GOOD),
        Value::Object(obj) => match obj.get("Code") {
            Some(code) => Ok(StatusCode(read_uint(code, "Code")?)),
            None => Ok(StatusCode::GOOD),
        },
        other => Ok(StatusCode(read_uint(other, "StatusCode")?)),
    }
}

pub fn read_date_time(v: &Value) -> Result<DateTime> {
    v.as_str()
        .ok_or_else(|| PubSubError::decode(format!("expected timestamp string, got {v}")))?
        .parse()
}

fn read_scalar(ty: VariantType, v: &Value) -> Result<Variant> {
    let mismatch = || PubSubError::decode(format!("expected {ty} body, got {v}"));
    let variant = match ty {
        VariantType::Boolean => Variant::Boolean(v.as_bool().ok_or_else(mismatch)?),
        VariantType::SByte => Variant::SByte(read_int(v, ty)?),
        VariantType::Byte => Variant::Byte(read_int(v, ty)?),
        VariantType::Int16 => Variant::Int16(read_int(v, ty)?),
        VariantType::UInt16 => Variant::UInt16(read_int(v, ty)?),
        VariantType::Int32 => Variant::Int32(read_int(v, ty)?),
        VariantType::UInt32 => Variant::UInt32(read_int(v, ty)?),
        VariantType::Int64 => Variant::Int64(read_int(v, ty)?),
        VariantType::UInt64 => Variant::UInt64(read_int(v, ty)?),
        VariantType::Float => Variant::Float(read_float(v).ok_or_else(mismatch)? as f32),
        VariantType::Double => Variant::Double(read_float(v).ok_or_else(mismatch)?),
        VariantType::String => Variant::String(v.as_str().ok_or_else(mismatch)?.to_string()),
        VariantType::DateTime => Variant::DateTime(read_date_time(v)?),
        VariantType::Guid => {
            let s = v.as_str().ok_or_else(mismatch)?;
            Variant::Guid(Uuid::parse_str(s).map_err(|e| PubSubError::decode(format!("bad guid {s:?}: {e}")))?)
        }
        VariantType::ByteString => {
            let s = v.as_str().ok_or_else(mismatch)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| PubSubError::decode(format!("bad base64: {e}")))?;
            Variant::ByteString(bytes)
        }
        VariantType::StatusCode => Variant::StatusCode(read_status_code(v)?),
    };
    Ok(variant)
}

/// Integers arrive as numbers, or as strings for the 64-bit types.
fn read_int<T>(v: &Value, ty: VariantType) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64> + std::str::FromStr,
{
    let out_of_range = || PubSubError::decode(format!("{v} out of range for {ty}"));
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                <T as TryFrom<i64>>::try_from(i).map_err(|_| out_of_range())
            } else if let Some(u) = n.as_u64() {
                <T as TryFrom<u64>>::try_from(u).map_err(|_| out_of_range())
            } else {
                Err(PubSubError::decode(format!("expected integer for {ty}, got {v}")))
            }
        }
        Value::String(s) => s.parse::<T>().map_err(|_| out_of_range()),
        _ => Err(PubSubError::decode(format!("expected integer for {ty}, got {v}"))),
    }
}

fn read_float(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn read_uint<T: TryFrom<u64>>(v: &Value, what: &str) -> Result<T> {
    v.as_u64()
        .and_then(|u| T::try_from(u).ok())
        .ok_or_else(|| PubSubError::decode(format!("{what}: expected unsigned integer, got {v}")))
}

pub(crate) fn as_object<'a>(v: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    v.as_object()
        .ok_or_else(|| PubSubError::decode(format!("{what}: expected JSON object, got {v}")))
}

/// Optional string field; `null` and missing are both `None`. Numbers are
/// accepted and rendered, since publishers may send numeric ids.
pub(crate) fn opt_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(PubSubError::decode(format!("{key}: expected string, got {other}"))),
    }
}

pub(crate) fn required_string(obj: &Map<String, Value>, key: &str) -> Result<String> {
    opt_string(obj, key)?.ok_or_else(|| PubSubError::decode(format!("missing {key}")))
}
