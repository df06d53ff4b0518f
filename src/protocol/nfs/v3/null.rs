//! Implementation of the NULL procedure (procedure 0) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.0.
//!
//! The NULL procedure does no work and is typically used to:
//! - Check if the server is responding (ping)
//! - Measure basic RPC round-trip time
//!
//! NULL takes no arguments and returns no results, just an RPC response indicating success.

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::ProcResult;

/// Handles NFSv3 NULL procedure
///
/// The accepted reply header written by the dispatcher is the whole answer.
pub fn nfsproc3_null(xid: u32, _: &mut impl Read, _: &mut impl Write) -> ProcResult {
    debug!("nfsproc3_null({:?}) ", xid);
    Ok(())
}
