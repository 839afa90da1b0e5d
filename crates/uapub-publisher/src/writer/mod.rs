//! Writer group runtime: builds, encodes and ships one network message per
//! publishing cycle.

pub mod source;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use uuid::Uuid;

use uapub_core::error::Result;
use uapub_core::{
    ConfigurationVersion, DataSetFieldContentMask, DataSetMessage, DataSetMessageContentMask, DateTime,
    NetworkMessage, NetworkMessageContentMask,
};

use crate::config::{WriterConfig, WriterGroupConfig};
use crate::obs::metrics::PublisherMetrics;
use crate::transport::Transport;

pub use source::{DataSource, SimulatedSource};

/// One dataset writer with its own sequence counter.
#[derive(Debug)]
pub struct WriterRuntime {
    pub id: u16,
    pub name: Option<String>,
    pub dataset_mask: DataSetMessageContentMask,
    pub field_mask: DataSetFieldContentMask,
    pub metadata_version: ConfigurationVersion,
    sequence: AtomicU32,
}

impl WriterRuntime {
    fn from_config(cfg: &WriterConfig) -> Result<Self> {
        Ok(Self {
            id: cfg.id,
            name: cfg.name.clone(),
            dataset_mask: cfg.dataset_mask()?,
            field_mask: cfg.field_mask()?,
            metadata_version: ConfigurationVersion::new(cfg.metadata_version.major, cfg.metadata_version.minor),
            sequence: AtomicU32::new(1),
        })
    }

    /// Next sequence number; wraps at `u32::MAX`.
    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// Compiled writer group (masks parsed once, counters live here).
#[derive(Debug)]
pub struct WriterGroupRuntime {
    name: String,
    interval: Duration,
    network_mask: NetworkMessageContentMask,
    publisher_id: Option<String>,
    dataset_class_id: Option<Uuid>,
    reply_to: Option<String>,
    writers: Vec<WriterRuntime>,
    cycles: AtomicU64,
}

impl WriterGroupRuntime {
    pub fn from_config(publisher_id: Option<&str>, cfg: &WriterGroupConfig) -> Result<Self> {
        Ok(Self {
            name: cfg.name.clone(),
            interval: Duration::from_millis(cfg.publishing_interval_ms),
            network_mask: cfg.network_mask()?,
            publisher_id: publisher_id.map(str::to_string),
            dataset_class_id: cfg.class_id()?,
            reply_to: cfg.reply_to.clone(),
            writers: cfg.writers.iter().map(WriterRuntime::from_config).collect::<Result<_>>()?,
            cycles: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn network_mask(&self) -> NetworkMessageContentMask {
        self.network_mask
    }

    pub fn writers(&self) -> &[WriterRuntime] {
        &self.writers
    }

    /// Sample every writer and assemble a fresh network message.
    pub async fn build_message(&self, source: &dyn DataSource) -> Result<NetworkMessage> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed);
        let now = DateTime::now();

        let mut msg = NetworkMessage::new(self.network_mask);
        msg.publisher_id = self.publisher_id.clone();
        msg.dataset_class_id = self.dataset_class_id;
        msg.reply_to = self.reply_to.clone();

        // Sample every writer before taking sequence numbers so a failed
        // sample leaves the counters untouched.
        let mut payloads = Vec::with_capacity(self.writers.len());
        for w in &self.writers {
            payloads.push(source.sample(&self.name, w.id, cycle).await?);
        }

        for (w, payload) in self.writers.iter().zip(payloads) {
            let mut ds = DataSetMessage::new(w.id, payload);
            ds.writer_name = w.name.clone();
            ds.sequence_number = w.next_sequence();
            ds.metadata_version = w.metadata_version;
            ds.timestamp = now;
            ds.content_mask = w.dataset_mask;
            ds.field_content_mask = w.field_mask;
            msg.messages.push(ds);
        }
        Ok(msg)
    }

    /// One publishing cycle. Failures are counted and logged here; the
    /// returned error is informational for the caller.
    pub async fn publish_once(
        &self,
        source: &dyn DataSource,
        transport: &dyn Transport,
        metrics: &PublisherMetrics,
    ) -> Result<usize> {
        let group = self.name.as_str();

        let msg = match self.build_message(source).await {
            Ok(m) => m,
            Err(e) => {
                metrics.sample_errors.inc(&[("group", group), ("code", e.code().as_str())]);
                tracing::warn!(group, code = e.code().as_str(), error = %e, "sampling failed");
                return Err(e);
            }
        };

        let started = Instant::now();
        let frame = match msg.encode_bytes() {
            Ok(b) => b,
            Err(e) => {
                metrics.encode_errors.inc(&[("group", group), ("code", e.code().as_str())]);
                tracing::warn!(group, code = e.code().as_str(), error = %e, "encode failed, message dropped");
                return Err(e);
            }
        };
        metrics.encode_duration.observe(&[("group", group)], started.elapsed());

        let len = frame.len();
        if let Err(e) = transport.send(group, frame).await {
            metrics.send_errors.inc(&[("group", group), ("transport", transport.name())]);
            tracing::warn!(group, transport = transport.name(), error = %e, "send failed");
            return Err(e);
        }

        metrics.messages_published.inc(&[("group", group)]);
        metrics.bytes_sent.add(&[("group", group)], len as u64);
        tracing::debug!(group, message_id = %msg.message_id, datasets = msg.messages.len(), bytes = len, "published");
        Ok(len)
    }
}
