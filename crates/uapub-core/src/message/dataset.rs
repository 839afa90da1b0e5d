//! Dataset message encoder.
//!
//! A dataset message is written as exactly one JSON object. On the header
//! path that object carries the header fields listed in [`HeaderField::ORDER`]
//! followed by a `Payload` object; on the headerless path it holds the
//! payload fields directly. The enclosing network encoder picks the name the
//! object is written under.

use serde_json::{Map, Value};

use crate::error::{PubSubError, Result};
use crate::json::decode::{
    as_object, opt_string, read_date_time, read_field, read_status_code, read_uint, required_string,
};
use crate::json::field::write_field;
use crate::json::writer::{JsonEncodable, JsonWriter};
use crate::mask::{DataSetFieldContentMask, DataSetMessageContentMask as D};
use crate::message::network::ReaderSettings;
use crate::types::{ConfigurationVersion, DataValue, DateTime, StatusCode};

/// Key frames carry every field; delta frames only the changed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataSetMessageType {
    #[default]
    KeyFrame,
    DeltaFrame,
}

impl DataSetMessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSetMessageType::KeyFrame => "ua-keyframe",
            DataSetMessageType::DeltaFrame => "ua-deltaframe",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "ua-keyframe" => Ok(DataSetMessageType::KeyFrame),
            "ua-deltaframe" => Ok(DataSetMessageType::DeltaFrame),
            other => Err(PubSubError::decode(format!("unknown dataset MessageType {other:?}"))),
        }
    }
}

/// Ordered field name to value mapping with unique names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSetPayload {
    fields: Vec<(String, DataValue)>,
}

impl DataSetPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. A name already present is rejected, never overwritten.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DataValue>) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            tracing::debug!(field = %name, "duplicate payload field rejected");
            return Err(PubSubError::DuplicateField(name));
        }
        self.fields.push((name, value.into()));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build from `(name, value)` pairs, stopping at the first duplicate.
    pub fn from_pairs<N, V, I>(pairs: I) -> Result<Self>
    where
        N: Into<String>,
        V: Into<DataValue>,
        I: IntoIterator<Item = (N, V)>,
    {
        let mut payload = Self::new();
        for (name, value) in pairs {
            payload.insert(name, value)?;
        }
        Ok(payload)
    }
}

/// One writer's dataset snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetMessage {
    pub writer_id: u16,
    pub writer_name: Option<String>,
    pub sequence_number: u32,
    pub metadata_version: ConfigurationVersion,
    pub timestamp: DateTime,
    pub status: StatusCode,
    pub message_type: DataSetMessageType,
    pub payload: DataSetPayload,
    pub content_mask: D,
    pub field_content_mask: DataSetFieldContentMask,
}

impl DataSetMessage {
    /// Message with empty masks, Good status and the minimum timestamp.
    pub fn new(writer_id: u16, payload: DataSetPayload) -> Self {
        Self {
            writer_id,
            writer_name: None,
            sequence_number: 0,
            metadata_version: ConfigurationVersion::default(),
            timestamp: DateTime::MIN,
            status: StatusCode::GOOD,
            message_type: DataSetMessageType::KeyFrame,
            payload,
            content_mask: D::empty(),
            field_content_mask: DataSetFieldContentMask::empty(),
        }
    }

    /// Write this message as one object named `name`.
    pub(crate) fn write(&self, w: &mut JsonWriter, name: Option<&str>, with_header: bool) -> Result<()> {
        if with_header {
            w.write_encodeable(name, self)
        } else {
            w.structure(name, |w| self.write_payload_fields(w))
        }
    }

    fn write_payload_fields(&self, w: &mut JsonWriter) -> Result<()> {
        self.payload
            .iter()
            .try_for_each(|(name, value)| write_field(w, name, value, self.field_content_mask))
    }

    fn write_header_field(&self, w: &mut JsonWriter, field: HeaderField) -> Result<()> {
        let name = Some(field.name());
        match (field, field.slot(self.content_mask)) {
            (_, HeaderSlot::Omitted) => Ok(()),
            (HeaderField::DataSetWriterId, _) => w.write_string(name, &self.writer_id.to_string()),
            (HeaderField::DataSetWriterName, _) => w.write_opt_string(name, self.writer_name.as_deref()),
            (HeaderField::SequenceNumber, HeaderSlot::Value) => w.write_u32(name, self.sequence_number),
            (HeaderField::SequenceNumber, HeaderSlot::Default) => w.write_u32(name, 0),
            (HeaderField::MetaDataVersion, HeaderSlot::Value) => w.write_encodeable(name, &self.metadata_version),
            (HeaderField::MetaDataVersion, HeaderSlot::Default) => w.write_null(name),
            (HeaderField::Timestamp, HeaderSlot::Value) => w.write_date_time(name, self.timestamp),
            (HeaderField::Timestamp, HeaderSlot::Default) => w.write_date_time(name, DateTime::MIN),
            (HeaderField::Status, HeaderSlot::Value) => w.write_status_code(name, self.status),
            (HeaderField::Status, HeaderSlot::Default) => w.write_status_code(name, StatusCode::GOOD),
            (HeaderField::MessageType, _) => w.write_string(name, self.message_type.as_str()),
        }
    }

    /// Inverse of [`DataSetMessage::write`].
    pub(crate) fn read(v: &Value, with_header: bool, settings: &ReaderSettings) -> Result<Self> {
        let obj = as_object(v, "dataset message")?;
        let mut msg = DataSetMessage::new(0, DataSetPayload::new());
        msg.content_mask = settings.data_set_content_mask;
        msg.field_content_mask = settings.field_content_mask;

        let payload = if with_header {
            msg.read_header(obj)?;
            match obj.get("Payload") {
                Some(p) => as_object(p, "Payload")?,
                None => return Err(PubSubError::decode("dataset message without Payload")),
            }
        } else {
            obj
        };
        for (name, value) in payload {
            let dv = read_field(value, msg.field_content_mask)
                .map_err(|e| PubSubError::decode(format!("field {name:?}: {e}")))?;
            msg.payload.insert(name.clone(), dv)?;
        }
        Ok(msg)
    }

    fn read_header(&mut self, obj: &Map<String, Value>) -> Result<()> {
        let id = required_string(obj, "DataSetWriterId")?;
        self.writer_id = id
            .parse()
            .map_err(|_| PubSubError::decode(format!("DataSetWriterId {id:?} is not a u16")))?;

        let mask = self.content_mask;
        let field = |flag: D, key: &str| obj.get(key).filter(|v| mask.contains(flag) && !v.is_null());

        if mask.contains(D::DATA_SET_WRITER_NAME) {
            self.writer_name = opt_string(obj, "DataSetWriterName")?;
        }
        if let Some(v) = field(D::SEQUENCE_NUMBER, "SequenceNumber") {
            self.sequence_number = read_uint(v, "SequenceNumber")?;
        }
        if let Some(v) = field(D::META_DATA_VERSION, "MetaDataVersion") {
            let mv = as_object(v, "MetaDataVersion")?;
            let part = |key: &str| mv.get(key).map_or(Ok(0), |v| read_uint(v, key));
            self.metadata_version = ConfigurationVersion::new(part("MajorVersion")?, part("MinorVersion")?);
        }
        if let Some(v) = field(D::TIMESTAMP, "Timestamp") {
            self.timestamp = read_date_time(v)?;
        }
        if let Some(v) = field(D::STATUS, "Status") {
            self.status = read_status_code(v)?;
        }
        if let Some(v) = field(D::MESSAGE_TYPE, "MessageType") {
            let s = v
                .as_str()
                .ok_or_else(|| PubSubError::decode(format!("MessageType: expected string, got {v}")))?;
            self.message_type = DataSetMessageType::parse(s)?;
        }
        Ok(())
    }
}

/// Header path: header fields in table order, then `Payload`.
impl JsonEncodable for DataSetMessage {
    fn encode_fields(&self, w: &mut JsonWriter) -> Result<()> {
        for field in HeaderField::ORDER {
            self.write_header_field(w, field)?;
        }
        w.structure(Some("Payload"), |w| self.write_payload_fields(w))
    }
}

impl JsonEncodable for ConfigurationVersion {
    fn encode_fields(&self, w: &mut JsonWriter) -> Result<()> {
        w.write_u32(Some("MajorVersion"), self.major)?;
        w.write_u32(Some("MinorVersion"), self.minor)
    }
}

/// Header fields of a dataset message, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    DataSetWriterId,
    DataSetWriterName,
    SequenceNumber,
    MetaDataVersion,
    Timestamp,
    Status,
    MessageType,
}

/// What the header path writes for one field under a given mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSlot {
    /// The message's own value.
    Value,
    /// The documented default literal.
    Default,
    /// Nothing at all.
    Omitted,
}

impl HeaderField {
    pub const ORDER: [HeaderField; 7] = [
        HeaderField::DataSetWriterId,
        HeaderField::DataSetWriterName,
        HeaderField::SequenceNumber,
        HeaderField::MetaDataVersion,
        HeaderField::Timestamp,
        HeaderField::Status,
        HeaderField::MessageType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HeaderField::DataSetWriterId => "DataSetWriterId",
            HeaderField::DataSetWriterName => "DataSetWriterName",
            HeaderField::SequenceNumber => "SequenceNumber",
            HeaderField::MetaDataVersion => "MetaDataVersion",
            HeaderField::Timestamp => "Timestamp",
            HeaderField::Status => "Status",
            HeaderField::MessageType => "MessageType",
        }
    }

    pub fn slot(self, mask: D) -> HeaderSlot {
        let (flag, unset) = match self {
            HeaderField::DataSetWriterId => return HeaderSlot::Value,
            HeaderField::DataSetWriterName => (D::DATA_SET_WRITER_NAME, HeaderSlot::Omitted),
            HeaderField::SequenceNumber => (D::SEQUENCE_NUMBER, HeaderSlot::Default),
            HeaderField::MetaDataVersion => (D::META_DATA_VERSION, HeaderSlot::Default),
            HeaderField::Timestamp => (D::TIMESTAMP, HeaderSlot::Default),
            HeaderField::Status => (D::STATUS, HeaderSlot::Default),
            HeaderField::MessageType => (D::MESSAGE_TYPE, HeaderSlot::Omitted),
        };
        if mask.contains(flag) {
            HeaderSlot::Value
        } else {
            unset
        }
    }
}
