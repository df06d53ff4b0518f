//! Shared server state and the entry point transports call.
//!
//! Every request runs to completion under one lock: the file table, the
//! attribute stores and the cached write descriptors are only ever touched
//! by one procedure at a time. The periodic flush takes the same lock.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::protocol::nfs::{
    BootParams, BootparamService, MountList, MountService, NfsService, PortmapService,
    PortmapTable,
};
use crate::protocol::rpc::{self, RegistryError, ServerRegistry, Transport};
use crate::vfs::Vfs;

/// Everything a procedure may read or change.
#[derive(Debug)]
pub struct ServerState {
    pub vfs: Vfs,
    pub mounts: MountList,
    pub portmap: PortmapTable,
    pub bootparams: BootParams,
    /// Directory path clients mount, e.g. `/export`.
    pub export_name: String,
}

impl ServerState {
    pub fn new(vfs: Vfs, export_name: impl Into<String>, bootparams: BootParams) -> Self {
        ServerState {
            vfs,
            mounts: MountList::new(),
            portmap: PortmapTable::new(),
            bootparams,
            export_name: export_name.into(),
        }
    }
}

/// Registry with the NFS, MOUNT, PORTMAP and BOOTPARAM programs.
pub fn default_registry() -> Result<ServerRegistry, RegistryError> {
    let mut registry = ServerRegistry::new();
    registry.register(Box::new(PortmapService))?;
    registry.register(Box::new(NfsService))?;
    registry.register(Box::new(MountService))?;
    registry.register(Box::new(BootparamService))?;
    Ok(registry)
}

pub struct NfsServer {
    registry: ServerRegistry,
    state: Mutex<ServerState>,
}

impl NfsServer {
    /// Registers the standard programs and publishes them in the portmap
    /// table: the portmapper on `portmap_port`, the rest on `nfs_port`.
    pub fn new(
        mut state: ServerState,
        nfs_port: u16,
        portmap_port: u16,
    ) -> Result<Self, RegistryError> {
        let registry = default_registry()?;
        state.portmap = PortmapTable::from_registry(&registry, nfs_port, portmap_port);
        Ok(Self::with_registry(registry, state))
    }

    pub fn with_registry(registry: ServerRegistry, state: ServerState) -> Self {
        NfsServer { registry, state: Mutex::new(state) }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    /// Processes one RPC message; `None` means nothing is sent back.
    pub async fn handle(
        &self,
        transport: Transport,
        input: &[u8],
        client_addr: SocketAddr,
    ) -> Option<Vec<u8>> {
        let mut state = self.state.lock().await;
        rpc::handle_rpc(&self.registry, &mut state, transport, input, client_addr)
    }

    /// Exclusive access to the state, as a procedure would have it.
    pub async fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().await
    }

    /// Writes dirty attribute stores; returns how many were written.
    pub async fn flush(&self) -> usize {
        self.state.lock().await.vfs.flush_attrs()
    }

    /// Closes cached write descriptors and flushes everything.
    pub async fn shutdown(&self) -> usize {
        let mut state = self.state.lock().await;
        let open = state.vfs.open_writes();
        let flushed = state.vfs.shutdown();
        info!("closed {} write descriptors, flushed {} attribute stores", open, flushed);
        flushed
    }

    /// Flushes attribute stores every `period` until the task is aborted.
    pub fn spawn_flush_task(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let server = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let flushed = server.flush().await;
                if flushed > 0 {
                    debug!("flushed {} attribute stores", flushed);
                }
            }
        })
    }
}
