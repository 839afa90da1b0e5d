use std::fmt;

use uuid::Uuid;

use crate::error::{PubSubError, Result};
use crate::types::{DateTime, StatusCode};

/// Built-in type ids as they appear in the reversible `Type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    DateTime,
    Guid,
    ByteString,
    StatusCode,
}

impl VariantType {
    pub fn id(self) -> u8 {
        match self {
            VariantType::Boolean => 1,
            VariantType::SByte => 2,
            VariantType::Byte => 3,
            VariantType::Int16 => 4,
            VariantType::UInt16 => 5,
            VariantType::Int32 => 6,
            VariantType::UInt32 => 7,
            VariantType::Int64 => 8,
            VariantType::UInt64 => 9,
            VariantType::Float => 10,
            VariantType::Double => 11,
            VariantType::String => 12,
            VariantType::DateTime => 13,
            VariantType::Guid => 14,
            VariantType::ByteString => 15,
            VariantType::StatusCode => 19,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        let ty = match id {
            1 => VariantType::Boolean,
            2 => VariantType::SByte,
            3 => VariantType::Byte,
            4 => VariantType::Int16,
            5 => VariantType::UInt16,
            6 => VariantType::Int32,
            7 => VariantType::UInt32,
            8 => VariantType::Int64,
            9 => VariantType::UInt64,
            10 => VariantType::Float,
            11 => VariantType::Double,
            12 => VariantType::String,
            13 => VariantType::DateTime,
            14 => VariantType::Guid,
            15 => VariantType::ByteString,
            19 => VariantType::StatusCode,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A scalar or one-dimensional array value.
///
/// Arrays are homogeneous and carry their element type so that empty arrays
/// still encode reversibly. Build them with [`Variant::array`] to get that
/// checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Null,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    DateTime(DateTime),
    Guid(Uuid),
    ByteString(Vec<u8>),
    StatusCode(StatusCode),
    Array(VariantType, Vec<Variant>),
}

impl Variant {
    /// Homogeneous array from scalar elements.
    pub fn array(values: Vec<Variant>) -> Result<Variant> {
        let first = values
            .first()
            .ok_or_else(|| PubSubError::InvalidValue("empty array needs an element type".into()))?;
        let ty = first
            .scalar_type()
            .ok_or_else(|| PubSubError::InvalidValue("array elements must be non-null scalars".into()))?;
        if let Some(bad) = values.iter().find(|v| v.scalar_type() != Some(ty)) {
            return Err(PubSubError::InvalidValue(format!(
                "mixed array: expected {ty}, found {}",
                bad.type_name()
            )));
        }
        Ok(Variant::Array(ty, values))
    }

    pub fn empty_array(ty: VariantType) -> Variant {
        Variant::Array(ty, Vec::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Variant::Null)
    }

    /// Type id for the `Type` field; arrays report their element type.
    pub fn variant_type(&self) -> Option<VariantType> {
        match self {
            Variant::Array(ty, _) => Some(*ty),
            other => other.scalar_type(),
        }
    }

    fn scalar_type(&self) -> Option<VariantType> {
        let ty = match self {
            Variant::Null | Variant::Array(..) => return None,
            Variant::Boolean(_) => VariantType::Boolean,
            Variant::SByte(_) => VariantType::SByte,
            Variant::Byte(_) => VariantType::Byte,
            Variant::Int16(_) => VariantType::Int16,
            Variant::UInt16(_) => VariantType::UInt16,
            Variant::Int32(_) => VariantType::Int32,
            Variant::UInt32(_) => VariantType::UInt32,
            Variant::Int64(_) => VariantType::Int64,
            Variant::UInt64(_) => VariantType::UInt64,
            Variant::Float(_) => VariantType::Float,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::DateTime(_) => VariantType::DateTime,
            Variant::Guid(_) => VariantType::Guid,
            Variant::ByteString(_) => VariantType::ByteString,
            Variant::StatusCode(_) => VariantType::StatusCode,
        };
        Some(ty)
    }

    fn type_name(&self) -> String {
        match self {
            Variant::Null => "Null".into(),
            Variant::Array(ty, _) => format!("Array<{ty}>"),
            other => other.scalar_type().map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

macro_rules! variant_from {
    ($($t:ty => $v:ident),* $(,)?) => {
        $(impl From<$t> for Variant {
            fn from(v: $t) -> Self {
                Variant::$v(v)
            }
        })*
    };
}

variant_from!(
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime => DateTime,
    Uuid => Guid,
    StatusCode => StatusCode,
);

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ids_round_trip() {
        for id in 0..=25u8 {
            if let Some(ty) = VariantType::from_id(id) {
                assert_eq!(ty.id(), id);
            }
        }
        assert_eq!(VariantType::from_id(16), None);
    }

    #[test]
    fn array_must_be_homogeneous() {
        let ok = Variant::array(vec![Variant::Int32(1), Variant::Int32(2)]).unwrap();
        assert_eq!(ok.variant_type(), Some(VariantType::Int32));

        let err = Variant::array(vec![Variant::Int32(1), Variant::Double(2.0)]).unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_VALUE");
        assert!(err.to_string().contains("Double"));
    }

    #[test]
    fn array_rejects_null_and_empty() {
        assert!(Variant::array(vec![Variant::Null]).is_err());
        assert!(Variant::array(Vec::new()).is_err());
        assert_eq!(
            Variant::empty_array(VariantType::String).variant_type(),
            Some(VariantType::String)
        );
    }
}
