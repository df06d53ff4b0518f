//! Implementation of the `READLINK` procedure (procedure 5) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.5.
//!
//! Returns the link target exactly as stored; the server never interprets it.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `READLINK` procedure (procedure 5)
pub fn nfsproc3_readlink(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_readlink({:?},{:?}) ", xid, handle);

    let handle = match FileHandle::from_v3(&handle) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            return Ok(());
        }
    };
    match context.state.vfs.readlink(&handle) {
        Ok((target, attrs)) => {
            debug!(" {:?} --> {:?}", xid, String::from_utf8_lossy(&target));
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            nfs3::nfspath3::from(target).serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_readlink error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&handle)).serialize(output)?;
        }
    }
    Ok(())
}
