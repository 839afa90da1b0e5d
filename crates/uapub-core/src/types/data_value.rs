use crate::types::{DateTime, StatusCode, Variant};

/// A value with its optional quality attributes, as captured by a publisher.
///
/// Absent attributes are simply not emitted; the field content mask decides
/// which present ones make it onto the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: Variant,
    pub status: Option<StatusCode>,
    pub source_timestamp: Option<DateTime>,
    pub source_picoseconds: Option<u16>,
    pub server_timestamp: Option<DateTime>,
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// Bare value without quality attributes.
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source_timestamp(mut self, ts: DateTime) -> Self {
        self.source_timestamp = Some(ts);
        self
    }

    pub fn with_server_timestamp(mut self, ts: DateTime) -> Self {
        self.server_timestamp = Some(ts);
        self
    }

    pub fn with_source_picoseconds(mut self, ps: u16) -> Self {
        self.source_picoseconds = Some(ps);
        self
    }

    pub fn with_server_picoseconds(mut self, ps: u16) -> Self {
        self.server_picoseconds = Some(ps);
        self
    }
}

impl From<Variant> for DataValue {
    fn from(value: Variant) -> Self {
        DataValue::new(value)
    }
}
