//! Data sources sampled once per publishing cycle.

use std::collections::HashMap;

use async_trait::async_trait;

use uapub_core::error::{PubSubError, Result};
use uapub_core::{DataSetPayload, DataValue, DateTime, StatusCode, Variant};

use crate::config::{FieldConfig, PublisherConfig, SignalKind};

/// Supplies the payload of one dataset writer.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn sample(&self, group: &str, writer_id: u16, cycle: u64) -> Result<DataSetPayload>;
}

#[derive(Debug, Clone)]
struct Signal {
    name: String,
    kind: SignalKind,
    period_ms: u64,
    amplitude: f64,
    value: f64,
    text: String,
    interval_ms: u64,
}

impl Signal {
    fn new(cfg: &FieldConfig, interval_ms: u64) -> Self {
        Self {
            name: cfg.name.clone(),
            kind: cfg.signal,
            period_ms: cfg.period_ms.max(1),
            amplitude: cfg.amplitude,
            value: cfg.value.unwrap_or_default(),
            text: cfg.text.clone().unwrap_or_default(),
            interval_ms,
        }
    }

    fn at(&self, cycle: u64) -> Variant {
        match self.kind {
            SignalKind::Counter => Variant::UInt32(cycle as u32),
            SignalKind::Sine => {
                let elapsed = cycle.wrapping_mul(self.interval_ms) % self.period_ms;
                let phase = elapsed as f64 / self.period_ms as f64;
                Variant::Double(self.amplitude * (phase * std::f64::consts::TAU).sin())
            }
            SignalKind::Toggle => Variant::Boolean(cycle % 2 == 1),
            SignalKind::Constant => Variant::Double(self.value),
            SignalKind::Text => Variant::String(self.text.clone()),
        }
    }
}

/// Synthetic signals declared in the config, keyed by group and writer.
#[derive(Debug, Default)]
pub struct SimulatedSource {
    writers: HashMap<(String, u16), Vec<Signal>>,
}

impl SimulatedSource {
    pub fn from_config(cfg: &PublisherConfig) -> Self {
        let mut writers = HashMap::new();
        for g in &cfg.writer_groups {
            for w in &g.writers {
                let signals = w.fields.iter().map(|f| Signal::new(f, g.publishing_interval_ms)).collect();
                writers.insert((g.name.clone(), w.id), signals);
            }
        }
        Self { writers }
    }
}

#[async_trait]
impl DataSource for SimulatedSource {
    async fn sample(&self, group: &str, writer_id: u16, cycle: u64) -> Result<DataSetPayload> {
        let signals = self
            .writers
            .get(&(group.to_string(), writer_id))
            .ok_or_else(|| PubSubError::Internal(format!("no signals for group {group} writer {writer_id}")))?;
        let now = DateTime::now();
        DataSetPayload::from_pairs(signals.iter().map(|s| {
            let value = DataValue::new(s.at(cycle))
                .with_status(StatusCode::GOOD)
                .with_source_timestamp(now)
                .with_server_timestamp(now);
            (s.name.clone(), value)
        }))
    }
}
