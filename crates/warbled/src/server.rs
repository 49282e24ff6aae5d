//! UDP receive loop for the OSC control surface.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::osc::{decode_messages, Command};

pub struct OscServer {
    socket: UdpSocket,
    dispatcher: Dispatcher,
}

impl OscServer {
    pub async fn bind(addr: &str, dispatcher: Dispatcher) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening for OSC on {}", socket.local_addr()?);
        Ok(Self { socket, dispatcher })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve until `shutdown` is cancelled. Bad input is logged and dropped;
    /// only shutdown ends the loop.
    pub async fn run(self, shutdown: CancellationToken) -> io::Result<()> {
        let mut buf = vec![0u8; rosc::decoder::MTU];
        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };
            match received {
                Ok((len, from)) => self.handle_datagram(&buf[..len], from).await,
                Err(e) => warn!("OSC receive failed: {}", e),
            }
        }

        self.dispatcher.session().stop_generation().await;
        info!("OSC server stopped");
        Ok(())
    }

    async fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) {
        let messages = match decode_messages(datagram) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Dropping datagram from {}: {}", from, e);
                return;
            }
        };

        for msg in messages {
            let command = match Command::from_message(&msg) {
                Ok(command) => command,
                Err(e) => {
                    warn!("Dropping message from {}: {}", from, e);
                    continue;
                }
            };
            if let Err(e) = self.dispatcher.dispatch(command).await {
                warn!("Rejected {} from {}: {}", msg.addr, from, e);
            } else {
                debug!(addr = %msg.addr, %from, "handled");
            }
        }
    }
}
