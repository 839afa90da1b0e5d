//! Publisher config loader (strict parsing).

pub mod schema;

use std::fs;

use uapub_core::error::{PubSubError, Result};

pub use schema::{
    FieldConfig, MetaDataVersionConfig, PublisherConfig, PublisherSection, SignalKind, TransportKind,
    TransportSection, WriterConfig, WriterGroupConfig,
};

pub fn load_from_file(path: &str) -> Result<PublisherConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PubSubError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PublisherConfig> {
    let cfg: PublisherConfig =
        serde_yaml::from_str(s).map_err(|e| PubSubError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
