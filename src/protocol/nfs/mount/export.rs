use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::Serialize;

/// Handles MOUNTPROC_EXPORT
///
/// Lists the single export with an empty group list, meaning every client
/// may mount it.
pub fn mountproc_export(
    xid: u32,
    _: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    debug!("mountproc_export({:?}) ", xid);
    // exportnode: dir, groups (empty list), next
    true.serialize(output)?;
    context.state.export_name.serialize(output)?;
    false.serialize(output)?;
    false.serialize(output)?;
    Ok(())
}
