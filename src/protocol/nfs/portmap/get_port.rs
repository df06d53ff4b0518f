//! Implementation of the GETPORT procedure (procedure 3) for port mapper protocol
//! as defined in RFC 1057 A.2 section.
//! https://datatracker.ietf.org/doc/rfc1057/

use std::io::{Read, Write};

use tracing::debug;

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, portmap, Serialize};

/// Handles PMAPPROC_GETPORT procedure.
///
/// Maps a program, version and protocol to the port serving it. The `port`
/// field of the argument is ignored; an unregistered triple answers 0.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the port mapping request
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the portmap table
pub fn pmapproc_getport(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let mapping = deserialize::<portmap::mapping>(input)?;
    debug!("pmapproc_getport({:?}, {:?}) ", xid, mapping);
    let port = u32::from(context.state.portmap.port(mapping.prog, mapping.vers, mapping.prot));
    debug!("\t{:?} --> {:?}", xid, port);
    port.serialize(output)?;
    Ok(())
}
