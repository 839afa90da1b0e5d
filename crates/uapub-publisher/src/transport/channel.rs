use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use uapub_core::error::{PubSubError, Result};

use super::Transport;

/// One shipped network message.
#[derive(Debug, Clone)]
pub struct Frame {
    pub group: String,
    pub bytes: Bytes,
}

/// Hands frames to an in-process receiver.
pub struct ChannelTransport {
    tx: mpsc::Sender<Frame>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn send(&self, group: &str, frame: Bytes) -> Result<()> {
        self.tx
            .send(Frame {
                group: group.to_string(),
                bytes: frame,
            })
            .await
            .map_err(|_| PubSubError::Transport("channel receiver dropped".into()))
    }
}
