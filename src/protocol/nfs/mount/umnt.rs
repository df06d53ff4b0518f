use std::io::{Read, Write};

use tracing::{debug, info};

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{mount, read_opaque_max};

/// Handles MOUNTPROC_UMNT: forgets the caller's mount of one directory.
/// There is no result body.
pub fn mountproc_umnt(
    xid: u32,
    input: &mut impl Read,
    _: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let path = read_opaque_max(input, mount::MNTPATHLEN)?;
    let path = String::from_utf8_lossy(&path).into_owned();
    debug!("mountproc_umnt({:?},{:?}) ", xid, path);
    let client = context.client_name();
    if context.state.mounts.remove(&client, &path) {
        info!("{} unmounted {}", client, path);
    }
    Ok(())
}
