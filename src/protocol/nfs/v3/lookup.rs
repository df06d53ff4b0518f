//! Implementation of the `LOOKUP` procedure (procedure 3) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.3.
//!
//! The `LOOKUP` procedure searches a directory for a specific name and returns the
//! file handle and attributes for the corresponding file system object. The client specifies:
//! - The file handle of the directory to search
//! - The name to look up
//!
//! On successful return, the server provides:
//! - The file handle of the object found
//! - The attributes of the object found
//! - The attributes of the directory searched
//!
//! A handle is minted the first time a path is looked up and stays bound to
//! that path for the rest of the server's lifetime. The attribute sidecar
//! file is invisible to LOOKUP.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `LOOKUP` procedure (procedure 3)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the directory handle and name
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_lookup(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let dirops = deserialize::<nfs3::diropargs3>(input)?;
    debug!("nfsproc3_lookup({:?},{:?}) ", xid, dirops);

    let dir = match FileHandle::from_v3(&dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.lookup(&dir, &dirops.name) {
        Ok((fh, attrs)) => {
            debug!("lookup success {:?} --> {:x}", xid, fh.id());
            let dir_attr = post_op_attr(context.state.vfs.try_getattr(&dir));
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            fh.to_v3().serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            dir_attr.serialize(output)?;
        }
        Err(stat) => {
            debug!("lookup error {:?}({:?}) --> {:?}", xid, dirops.name, stat);
            if stat != nfs3::nfsstat3::NFS3ERR_NOENT {
                error!("nfsproc3_lookup error {:?} --> {:?}", xid, stat);
            }
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&dir)).serialize(output)?;
        }
    }
    Ok(())
}
