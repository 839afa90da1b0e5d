use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;
use uapub_core::error::{PubSubError, Result};
use uapub_core::{DataSetFieldContentMask, DataSetMessageContentMask, NetworkMessageContentMask};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    pub version: u32,

    #[serde(default)]
    pub publisher: PublisherSection,

    pub transport: TransportSection,

    #[serde(default)]
    pub writer_groups: Vec<WriterGroupConfig>,
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PubSubError::UnsupportedVersion);
        }
        if self.writer_groups.is_empty() {
            return Err(PubSubError::BadConfig("writer_groups must not be empty".into()));
        }

        self.publisher.validate()?;
        self.transport.validate()?;

        let mut names = HashSet::new();
        for g in &self.writer_groups {
            g.validate()?;
            if !names.insert(g.name.as_str()) {
                return Err(PubSubError::BadConfig(format!("duplicate writer group name: {}", g.name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherSection {
    /// Emitted as `PublisherId` when the group's mask asks for it.
    #[serde(default)]
    pub publisher_id: Option<String>,

    /// Listen address for `/healthz`, `/readyz` and `/metrics`. Disabled when unset.
    #[serde(default)]
    pub ops_listen: Option<String>,
}

impl PublisherSection {
    pub fn validate(&self) -> Result<()> {
        if let Some(listen) = &self.ops_listen {
            listen
                .parse::<SocketAddr>()
                .map_err(|e| PubSubError::BadConfig(format!("publisher.ops_listen {listen:?}: {e}")))?;
        }
        if self.publisher_id.as_deref().is_some_and(str::is_empty) {
            return Err(PubSubError::BadConfig("publisher.publisher_id must not be empty".into()));
        }
        Ok(())
    }

    pub fn ops_addr(&self) -> Option<SocketAddr> {
        self.ops_listen.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Udp,
    Log,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportSection {
    pub kind: TransportKind,

    /// Datagram destination (`udp` only).
    #[serde(default)]
    pub target: Option<String>,
}

impl TransportSection {
    pub fn validate(&self) -> Result<()> {
        if self.kind == TransportKind::Udp {
            self.udp_target()?;
        }
        Ok(())
    }

    pub fn udp_target(&self) -> Result<SocketAddr> {
        let target = self
            .target
            .as_deref()
            .ok_or_else(|| PubSubError::BadConfig("transport.target is required for udp".into()))?;
        target
            .parse()
            .map_err(|e| PubSubError::BadConfig(format!("transport.target {target:?}: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterGroupConfig {
    pub name: String,

    #[serde(default = "default_publishing_interval_ms")]
    pub publishing_interval_ms: u64,

    #[serde(default)]
    pub network_content_mask: Vec<String>,

    #[serde(default)]
    pub dataset_class_id: Option<String>,

    #[serde(default)]
    pub reply_to: Option<String>,

    #[serde(default)]
    pub writers: Vec<WriterConfig>,
}

impl WriterGroupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PubSubError::BadConfig("writer group name must not be empty".into()));
        }
        if !(10..=3_600_000).contains(&self.publishing_interval_ms) {
            return Err(PubSubError::BadConfig(format!(
                "writer group {}: publishing_interval_ms must be between 10 and 3600000",
                self.name
            )));
        }
        let mask = self.network_mask()?;
        self.class_id()?;

        if self.writers.is_empty() {
            return Err(PubSubError::BadConfig(format!("writer group {}: writers must not be empty", self.name)));
        }
        if mask.contains(NetworkMessageContentMask::SINGLE_DATA_SET_MESSAGE) && self.writers.len() != 1 {
            return Err(PubSubError::BadConfig(format!(
                "writer group {}: SingleDataSetMessage requires exactly one writer, got {}",
                self.name,
                self.writers.len()
            )));
        }

        let mut ids = HashSet::new();
        for w in &self.writers {
            w.validate(&self.name)?;
            if !ids.insert(w.id) {
                return Err(PubSubError::BadConfig(format!(
                    "writer group {}: duplicate writer id {}",
                    self.name, w.id
                )));
            }
        }
        Ok(())
    }

    pub fn network_mask(&self) -> Result<NetworkMessageContentMask> {
        NetworkMessageContentMask::from_names(&self.network_content_mask)
    }

    pub fn class_id(&self) -> Result<Option<Uuid>> {
        self.dataset_class_id
            .as_deref()
            .map(|s| {
                Uuid::parse_str(s)
                    .map_err(|e| PubSubError::BadConfig(format!("writer group {}: dataset_class_id: {e}", self.name)))
            })
            .transpose()
    }
}

fn default_publishing_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    pub id: u16,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub dataset_content_mask: Vec<String>,

    #[serde(default)]
    pub field_content_mask: Vec<String>,

    #[serde(default)]
    pub metadata_version: MetaDataVersionConfig,

    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl WriterConfig {
    fn validate(&self, group: &str) -> Result<()> {
        if self.id == 0 {
            return Err(PubSubError::BadConfig(format!("writer group {group}: writer id must be non-zero")));
        }
        self.dataset_mask()?;
        self.field_mask()?;

        let mut names = HashSet::new();
        for f in &self.fields {
            f.validate(group, self.id)?;
            if !names.insert(f.name.as_str()) {
                return Err(PubSubError::BadConfig(format!(
                    "writer group {group}, writer {}: duplicate field {}",
                    self.id, f.name
                )));
            }
        }
        Ok(())
    }

    pub fn dataset_mask(&self) -> Result<DataSetMessageContentMask> {
        DataSetMessageContentMask::from_names(&self.dataset_content_mask)
    }

    pub fn field_mask(&self) -> Result<DataSetFieldContentMask> {
        DataSetFieldContentMask::from_names(&self.field_content_mask)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaDataVersionConfig {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Counter,
    Sine,
    Toggle,
    Constant,
    Text,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    pub name: String,
    pub signal: SignalKind,

    /// Sine period.
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Sine amplitude.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Value of a `constant` signal.
    #[serde(default)]
    pub value: Option<f64>,

    /// Value of a `text` signal.
    #[serde(default)]
    pub text: Option<String>,
}

impl FieldConfig {
    fn validate(&self, group: &str, writer: u16) -> Result<()> {
        let bad = |msg: &str| PubSubError::BadConfig(format!("writer group {group}, writer {writer}, field {}: {msg}", self.name));
        if self.name.is_empty() {
            return Err(bad("name must not be empty"));
        }
        match self.signal {
            SignalKind::Sine if self.period_ms == 0 => Err(bad("period_ms must be positive")),
            SignalKind::Constant if self.value.is_none() => Err(bad("constant signal needs a value")),
            SignalKind::Text if self.text.is_none() => Err(bad("text signal needs text")),
            _ => Ok(()),
        }
    }
}

fn default_period_ms() -> u64 {
    60_000
}
fn default_amplitude() -> f64 {
    1.0
}
