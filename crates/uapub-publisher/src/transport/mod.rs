//! Frame transports.
//!
//! The encoder hands over finished buffers only; a transport never sees a
//! partial document. Three implementations ship:
//! - [`udp::UdpTransport`]: one datagram per network message
//! - [`channel::ChannelTransport`]: in-process `mpsc`, for tests and embedders
//! - [`LogTransport`]: prints frames through `tracing`

pub mod channel;
pub mod udp;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use uapub_core::error::Result;

use crate::config::{TransportKind, TransportSection};

pub use channel::{ChannelTransport, Frame};
pub use udp::UdpTransport;

/// Ships encoded network messages.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, group: &str, frame: Bytes) -> Result<()>;
}

/// Writes each frame to the log at `info`.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, group: &str, frame: Bytes) -> Result<()> {
        tracing::info!(group, bytes = frame.len(), body = %String::from_utf8_lossy(&frame), "network message");
        Ok(())
    }
}

/// Build the configured transport.
pub async fn from_config(cfg: &TransportSection) -> Result<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match cfg.kind {
        TransportKind::Udp => Arc::new(UdpTransport::bind(cfg.udp_target()?).await?),
        TransportKind::Log => Arc::new(LogTransport),
    };
    tracing::info!(transport = transport.name(), "transport ready");
    Ok(transport)
}
