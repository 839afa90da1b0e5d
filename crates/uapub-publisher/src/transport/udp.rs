use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use uapub_core::error::{PubSubError, Result};

use super::Transport;

/// Sends every frame as one datagram to a fixed target (unicast or multicast).
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral local port of the target's address family.
    pub async fn bind(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| PubSubError::Transport(format!("udp bind {local} failed: {e}")))?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| PubSubError::Transport(format!("udp local_addr: {e}")))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn name(&self) -> &'static str {
        "udp"
    }

    async fn send(&self, group: &str, frame: Bytes) -> Result<()> {
        let sent = self
            .socket
            .send_to(&frame, self.target)
            .await
            .map_err(|e| PubSubError::Transport(format!("udp send to {} failed: {e}", self.target)))?;
        if sent != frame.len() {
            return Err(PubSubError::Transport(format!(
                "udp short send for group {group}: {sent} of {} bytes",
                frame.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn datagram_reaches_local_receiver() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = rx.local_addr().unwrap();
        let tx = UdpTransport::bind(target).await.unwrap();

        tx.send("g", Bytes::from_static(b"{\"a\":1}")).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"{\"a\":1}");
    }
}
