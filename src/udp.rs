//! UDP transport: one datagram in, at most one datagram out.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{info, warn};

use crate::protocol::rpc::Transport;
use crate::server::NfsServer;

/// Largest datagram accepted.
pub const MAX_DATAGRAM: usize = 65536;

pub struct NfsUdpSocket {
    socket: UdpSocket,
    server: Arc<NfsServer>,
}

impl NfsUdpSocket {
    pub async fn bind(addr: &str, server: Arc<NfsServer>) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening on {:?} (udp)", socket.local_addr()?);
        Ok(NfsUdpSocket { socket, server })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves datagrams in arrival order; returns only if receiving fails.
    pub async fn handle_forever(&self) -> io::Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            let Some(reply) = self.server.handle(Transport::Udp, &buf[..len], peer).await else {
                continue;
            };
            if let Err(e) = self.socket.send_to(&reply, peer).await {
                warn!("cannot send {} byte reply to {}: {}", reply.len(), peer, e);
            }
        }
    }
}
