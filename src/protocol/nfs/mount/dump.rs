use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::Serialize;

/// Handles MOUNTPROC_DUMP: the mount list as a linked list of
/// `(hostname, directory)` pairs.
pub fn mountproc_dump(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    debug!("mountproc_dump({:?}) ", xid);
    for entry in context.state.mounts.entries() {
        true.serialize(output)?;
        entry.serialize(output)?;
    }
    false.serialize(output)?;
    Ok(())
}
