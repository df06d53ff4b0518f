//! Implementation of the NULL procedure (procedure 0) for PORTMAP protocol
//! as defined in RFC 5531 (previously RFC 1057 Appendix A).

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::ProcResult;

/// Handles PORTMAP protocol NULL procedure (procedure 0)
///
/// Used by clients to check that the portmapper is responding. Takes no
/// arguments and returns nothing.
pub fn pmapproc_null(xid: u32, _: &mut impl Read, _: &mut impl Write) -> ProcResult {
    debug!("pmapproc_null({:?}) ", xid);
    Ok(())
}
