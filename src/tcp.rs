//! TCP transport.
//!
//! Each accepted connection gets its own task that reads record-marked
//! messages one at a time and writes each reply before reading the next.
//! A read error or end of stream ends the connection; nothing a client
//! sends can stop the listener.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::protocol::rpc::{self, Transport};
use crate::server::NfsServer;

/// NFS TCP listener that accepts client connections and feeds their
/// records to the shared [`NfsServer`].
pub struct NfsTcpListener {
    listener: TcpListener,
    server: Arc<NfsServer>,
}

/// Serves one connection until the client goes away.
async fn process_socket(
    mut socket: TcpStream,
    peer: SocketAddr,
    server: Arc<NfsServer>,
) -> Result<(), anyhow::Error> {
    let _ = socket.set_nodelay(true);
    loop {
        let record = match rpc::read_record(&mut socket).await {
            Ok(record) => record,
            Err(e) => {
                debug!("connection from {} closed: {:?}", peer, e);
                return Ok(());
            }
        };
        if let Some(reply) = server.handle(Transport::Tcp, &record, peer).await {
            socket.write_all(&reply).await?;
        }
    }
}

impl NfsTcpListener {
    /// Binds to `addr` ("ip:port"; port 0 picks a free one).
    pub async fn bind(addr: &str, server: Arc<NfsServer>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {:?} (tcp)", listener.local_addr()?);
        Ok(NfsTcpListener { listener, server })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever; returns only if `accept` fails.
    pub async fn handle_forever(&self) -> io::Result<()> {
        loop {
            let (socket, peer) = self.listener.accept().await?;
            info!("Accepting connection from {}", peer);
            let server = Arc::clone(&self.server);
            tokio::spawn(async move {
                if let Err(e) = process_socket(socket, peer, server).await {
                    error!("connection from {} failed: {:?}", peer, e);
                }
            });
        }
    }
}
