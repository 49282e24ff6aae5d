//! Outbound note delivery.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::osc::{encode_note, OscError};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Encode(#[from] OscError),

    #[error("failed to send note to {peer}: {source}")]
    Send { peer: SocketAddr, source: io::Error },
}

/// Destination for echoed and generated notes.
#[async_trait]
pub trait NoteSink: Send + Sync {
    async fn send_note(&self, note: usize) -> Result<(), SinkError>;
}

/// Sends `/note <int>` datagrams to a fixed peer.
pub struct UdpNoteSink {
    socket: UdpSocket,
    peer: SocketAddr,
}

impl UdpNoteSink {
    /// Resolve `peer` and bind an ephemeral local socket of the same family.
    pub async fn connect(peer: &str) -> io::Result<Self> {
        let peer = tokio::net::lookup_host(peer).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("peer address {peer} did not resolve"),
            )
        })?;
        let local = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).await?;
        info!("Sending notes to {}", peer);
        Ok(Self { socket, peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

#[async_trait]
impl NoteSink for UdpNoteSink {
    async fn send_note(&self, note: usize) -> Result<(), SinkError> {
        let bytes = encode_note(note)?;
        self.socket
            .send_to(&bytes, self.peer)
            .await
            .map_err(|source| SinkError::Send {
                peer: self.peer,
                source,
            })?;
        debug!(note, "note sent");
        Ok(())
    }
}
