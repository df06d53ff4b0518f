//! Implementation of the MKNOD procedure (procedure 11) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.11.
//!
//! Not supported over version 3. Clients that need device nodes create them
//! through NFSv2 CREATE, which records the node type in the shadow store.

use std::io::{Read, Write};

use tracing::{debug, warn};

use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{nfs3, Serialize};

/// Handles NFSv3 MKNOD procedure (procedure 11)
///
/// The arguments are not decoded; the reply is `NOTSUPP` with empty
/// directory attributes.
pub fn nfsproc3_mknod(
    xid: u32,
    _input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    debug!("nfsproc3_mknod({:?}) ", xid);
    warn!("MKNOD from {} is not supported", context.client_name());
    nfs3::nfsstat3::NFS3ERR_NOTSUPP.serialize(output)?;
    nfs3::wcc_data::default().serialize(output)?;
    Ok(())
}
