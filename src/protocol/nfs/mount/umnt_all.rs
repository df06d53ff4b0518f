use std::io::{Read, Write};

use tracing::{debug, info};

use crate::protocol::rpc::{self, ProcResult};

/// Handles MOUNTPROC_UMNTALL: forgets every mount of the caller.
pub fn mountproc_umnt_all(
    xid: u32,
    _: &mut impl Read,
    _: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    debug!("mountproc_umnt_all({:?}) ", xid);
    let client = context.client_name();
    let removed = context.state.mounts.remove_host(&client);
    if removed > 0 {
        info!("{} unmounted {} directories", client, removed);
    }
    Ok(())
}
