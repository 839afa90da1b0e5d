//! Shared application state for the publisher.

use std::sync::Arc;

use uapub_core::error::Result;

use crate::config::PublisherConfig;
use crate::obs::metrics::PublisherMetrics;
use crate::transport::Transport;
use crate::writer::{DataSource, WriterGroupRuntime};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: PublisherConfig,
    groups: Vec<Arc<WriterGroupRuntime>>,
    transport: Arc<dyn Transport>,
    source: Arc<dyn DataSource>,
    metrics: PublisherMetrics,
}

impl AppState {
    /// Validate the config and compile the writer groups. Startup errors are
    /// returned, never panicked.
    pub fn new(cfg: PublisherConfig, transport: Arc<dyn Transport>, source: Arc<dyn DataSource>) -> Result<Self> {
        cfg.validate()?;
        let publisher_id = cfg.publisher.publisher_id.as_deref();
        let groups = cfg
            .writer_groups
            .iter()
            .map(|g| WriterGroupRuntime::from_config(publisher_id, g).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        for g in &groups {
            tracing::info!(
                group = g.name(),
                interval_ms = g.interval().as_millis() as u64,
                writers = g.writers().len(),
                mask = %g.network_mask(),
                "writer group compiled"
            );
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                groups,
                transport,
                source,
                metrics: PublisherMetrics::default(),
            }),
        })
    }

    pub fn cfg(&self) -> &PublisherConfig {
        &self.inner.cfg
    }

    pub fn groups(&self) -> &[Arc<WriterGroupRuntime>] {
        &self.inner.groups
    }

    pub fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub fn source(&self) -> &dyn DataSource {
        self.inner.source.as_ref()
    }

    pub fn metrics(&self) -> &PublisherMetrics {
        &self.inner.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    /// Static lines appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![("uapub_writer_groups", self.inner.groups.len() as u64)]
    }
}
