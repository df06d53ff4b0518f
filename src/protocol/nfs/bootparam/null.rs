use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::ProcResult;

pub fn bootparamproc_null(xid: u32, _: &mut impl Read, _: &mut impl Write) -> ProcResult {
    debug!("bootparamproc_null({:?}) ", xid);
    Ok(())
}
