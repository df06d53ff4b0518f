use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::ProcResult;

/// Handles MOUNTPROC_NULL: no arguments, no results.
pub fn mountproc_null(xid: u32, _: &mut impl Read, _: &mut impl Write) -> ProcResult {
    debug!("mountproc_null({:?}) ", xid);
    Ok(())
}
