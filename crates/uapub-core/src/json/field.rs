//! Field encoding: one payload value under the field content mask.
//!
//! The mask is evaluated once into a [`FieldEncoding`], first match wins:
//!
//! | mask | encoding |
//! |------|----------|
//! | empty | reversible variant |
//! | contains `RawData` | non-reversible bare variant, nothing for null |
//! | anything else | DataValue object, filtered by the mask; inner value reversible iff `Reversible` |

use crate::error::Result;
use crate::json::writer::JsonWriter;
use crate::mask::DataSetFieldContentMask as F;
use crate::types::DataValue;

/// How a payload field is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    Variant,
    RawData,
    DataValue { reversible: bool },
}

impl FieldEncoding {
    pub fn for_mask(mask: F) -> Self {
        if mask.is_empty() {
            FieldEncoding::Variant
        } else if mask.contains(F::RAW_DATA) {
            FieldEncoding::RawData
        } else {
            FieldEncoding::DataValue {
                reversible: mask.contains(F::REVERSIBLE),
            }
        }
    }
}

/// Copy of `value` keeping only the attributes the mask asks for.
pub fn filter_data_value(value: &DataValue, mask: F) -> DataValue {
    DataValue {
        value: value.value.clone(),
        status: value.status.filter(|_| mask.contains(F::STATUS_CODE)),
        source_timestamp: value.source_timestamp.filter(|_| mask.contains(F::SOURCE_TIMESTAMP)),
        source_picoseconds: value.source_picoseconds.filter(|_| mask.contains(F::SOURCE_PICO_SECONDS)),
        server_timestamp: value.server_timestamp.filter(|_| mask.contains(F::SERVER_TIMESTAMP)),
        server_picoseconds: value.server_picoseconds.filter(|_| mask.contains(F::SERVER_PICO_SECONDS)),
    }
}

/// Write one payload field into the open `Payload` (or message) object.
pub fn write_field(w: &mut JsonWriter, name: &str, value: &DataValue, mask: F) -> Result<()> {
    match FieldEncoding::for_mask(mask) {
        FieldEncoding::Variant => w.write_variant(Some(name), &value.value, true),
        FieldEncoding::RawData => {
            if value.value.is_null() {
                tracing::trace!(field = name, "raw data field is null, omitted");
                return Ok(());
            }
            w.write_variant(Some(name), &value.value, false)
        }
        FieldEncoding::DataValue { reversible } => {
            w.write_data_value(Some(name), &filter_data_value(value, mask), reversible)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DateTime, StatusCode, Variant};

    fn sample() -> DataValue {
        DataValue::new(Variant::Double(2.5))
            .with_status(StatusCode(0x4000_0000))
            .with_source_timestamp(DateTime::MIN)
            .with_source_picoseconds(3)
            .with_server_timestamp(DateTime::MIN)
            .with_server_picoseconds(4)
    }

    fn encode(name: &str, value: &DataValue, mask: F) -> String {
        let mut w = JsonWriter::new();
        w.structure(None, |w| write_field(w, name, value, mask)).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn decision_table() {
        assert_eq!(FieldEncoding::for_mask(F::empty()), FieldEncoding::Variant);
        assert_eq!(FieldEncoding::for_mask(F::RAW_DATA), FieldEncoding::RawData);
        // RawData wins over everything else.
        assert_eq!(
            FieldEncoding::for_mask(F::RAW_DATA | F::STATUS_CODE | F::REVERSIBLE),
            FieldEncoding::RawData
        );
        assert_eq!(
            FieldEncoding::for_mask(F::STATUS_CODE),
            FieldEncoding::DataValue { reversible: false }
        );
        assert_eq!(
            FieldEncoding::for_mask(F::REVERSIBLE),
            FieldEncoding::DataValue { reversible: true }
        );
    }

    #[test]
    fn empty_mask_is_reversible_variant() {
        assert_eq!(encode("t", &sample(), F::empty()), r#"{"t":{"Type":11,"Body":2.5}}"#);
    }

    #[test]
    fn raw_data_is_bare() {
        assert_eq!(encode("t", &sample(), F::RAW_DATA), r#"{"t":2.5}"#);
    }

    #[test]
    fn raw_data_skips_null() {
        let v = DataValue::new(Variant::Null).with_status(StatusCode::BAD);
        assert_eq!(encode("gone", &v, F::RAW_DATA), "{}");
        // Not skipped on the other paths.
        assert_eq!(encode("kept", &v, F::empty()), r#"{"kept":null}"#);
    }

    #[test]
    fn data_value_filters_by_mask() {
        let out = encode("t", &sample(), F::STATUS_CODE | F::SOURCE_TIMESTAMP);
        assert_eq!(
            out,
            r#"{"t":{"Value":2.5,"Status":{"Code":1073741824,"Symbol":"Uncertain"},"SourceTimestamp":"0001-01-01T00:00:00Z"}}"#
        );
    }

    #[test]
    fn data_value_reversible_inner_value() {
        let out = encode("t", &sample(), F::REVERSIBLE | F::SERVER_PICO_SECONDS | F::STATUS_CODE);
        assert_eq!(
            out,
            r#"{"t":{"Value":{"Type":11,"Body":2.5},"Status":1073741824,"ServerPicoseconds":4}}"#
        );
    }

    #[test]
    fn filter_keeps_value_and_drops_unmasked() {
        let f = filter_data_value(&sample(), F::SERVER_TIMESTAMP);
        assert_eq!(f.value, Variant::Double(2.5));
        assert_eq!(f.status, None);
        assert_eq!(f.source_timestamp, None);
        assert_eq!(f.server_timestamp, Some(DateTime::MIN));
        assert_eq!(f.server_picoseconds, None);
    }
}
