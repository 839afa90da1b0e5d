//! JSON test vector loader shared by the encoder and round-trip tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::fs;

use serde::Deserialize;

use uapub_core::json::decode::{read_status_code, read_variant};
use uapub_core::{
    ConfigurationVersion, DataSetFieldContentMask, DataSetMessage, DataSetMessageContentMask, DataSetPayload,
    DataValue, NetworkMessage, NetworkMessageContentMask, ReaderSettings, Result,
};

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub message: MessageSpec,
    #[serde(default)]
    pub expect: Option<serde_json::Value>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageSpec {
    #[serde(default)]
    pub network_content_mask: Vec<String>,
    pub message_id: String,
    #[serde(default)]
    pub publisher_id: Option<String>,
    #[serde(default)]
    pub dataset_class_id: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub messages: Vec<DataSetSpec>,
}

#[derive(Debug, Deserialize)]
pub struct DataSetSpec {
    pub writer_id: u16,
    #[serde(default)]
    pub writer_name: Option<String>,
    #[serde(default)]
    pub sequence_number: u32,
    #[serde(default)]
    pub metadata_version: Option<(u32, u32)>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<u32>,
    #[serde(default)]
    pub dataset_content_mask: Vec<String>,
    #[serde(default)]
    pub field_content_mask: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// `value` uses the reversible `{"Type","Body"}` form (or `null`).
#[derive(Debug, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub source_timestamp: Option<String>,
    #[serde(default)]
    pub source_picoseconds: Option<u16>,
    #[serde(default)]
    pub server_timestamp: Option<String>,
    #[serde(default)]
    pub server_picoseconds: Option<u16>,
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap()
}

impl FieldSpec {
    fn data_value(&self) -> DataValue {
        DataValue {
            value: read_variant(&self.value, true).unwrap(),
            status: self.status.as_ref().map(|s| read_status_code(s).unwrap()),
            source_timestamp: self.source_timestamp.as_ref().map(|t| t.parse().unwrap()),
            source_picoseconds: self.source_picoseconds,
            server_timestamp: self.server_timestamp.as_ref().map(|t| t.parse().unwrap()),
            server_picoseconds: self.server_picoseconds,
        }
    }
}

impl DataSetSpec {
    fn build(&self) -> Result<DataSetMessage> {
        let payload = DataSetPayload::from_pairs(self.fields.iter().map(|f| (f.name.clone(), f.data_value())))?;
        let mut m = DataSetMessage::new(self.writer_id, payload);
        m.writer_name = self.writer_name.clone();
        m.sequence_number = self.sequence_number;
        if let Some((major, minor)) = self.metadata_version {
            m.metadata_version = ConfigurationVersion::new(major, minor);
        }
        if let Some(ts) = &self.timestamp {
            m.timestamp = ts.parse().unwrap();
        }
        if let Some(status) = self.status {
            m.status = status.into();
        }
        m.content_mask = DataSetMessageContentMask::from_names(&self.dataset_content_mask).unwrap();
        m.field_content_mask = DataSetFieldContentMask::from_names(&self.field_content_mask).unwrap();
        Ok(m)
    }
}

impl MessageSpec {
    /// Build the network message; payload construction errors surface here.
    pub fn build(&self) -> Result<NetworkMessage> {
        let mut m = NetworkMessage::new(NetworkMessageContentMask::from_names(&self.network_content_mask).unwrap());
        m.message_id = self.message_id.clone();
        m.publisher_id = self.publisher_id.clone();
        m.dataset_class_id = self.dataset_class_id.as_ref().map(|s| s.parse().unwrap());
        m.reply_to = self.reply_to.clone();
        m.messages = self.messages.iter().map(DataSetSpec::build).collect::<Result<Vec<_>>>()?;
        Ok(m)
    }

    /// Reader settings matching the first dataset message's masks.
    pub fn reader_settings(&self) -> ReaderSettings {
        let first = self.messages.first();
        ReaderSettings {
            network_content_mask: NetworkMessageContentMask::from_names(&self.network_content_mask).unwrap(),
            data_set_content_mask: first
                .map(|m| DataSetMessageContentMask::from_names(&m.dataset_content_mask).unwrap())
                .unwrap_or_default(),
            field_content_mask: first
                .map(|m| DataSetFieldContentMask::from_names(&m.field_content_mask).unwrap())
                .unwrap_or_default(),
        }
    }
}
