use std::io::Write;

use tracing::debug;

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::Serialize;

/// Implements PMAPPROC_DUMP operation from RFC 1057 (Port Mapper Protocol)
/// Returns all entries from the port mapper's registration table
///
/// # XDR Protocol Notes (RFC 4506)
/// The `pmaplist` is a linked list: each mapping is preceded by TRUE and the
/// list ends with FALSE, so an empty table is a single FALSE.
pub fn pmapproc_dump(
    xid: u32,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    debug!("pmapproc_dump({:?}) ", xid);
    for map in context.state.portmap.mappings() {
        true.serialize(output)?;
        map.serialize(output)?;
    }
    false.serialize(output)?;
    Ok(())
}
