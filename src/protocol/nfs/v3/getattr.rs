//! Implementation of the `GETATTR` procedure (procedure 1) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.1.
//!
//! The `GETATTR` procedure retrieves file attributes for a specified file system object.
//! It is used by NFS clients to:
//! - Check if cached attributes are still valid
//! - Get initial attributes for files and directories
//! - Check file/directory sizes, permissions, ownership, etc.
//!
//! The attributes returned are the host `lstat` merged with the attribute
//! shadow store, so the client sees the mode and ownership it last set.

use std::io::{Read, Write};

use tracing::{debug, error};

use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `GETATTR` procedure (procedure 1)
///
/// `GETATTR` retrieves attributes for a specified file system object.
/// Takes a file handle as input and returns the file's attributes.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the file handle
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_getattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_getattr({:?},{:?}) ", xid, handle);

    let result = FileHandle::from_v3(&handle).and_then(|fh| context.state.vfs.getattr(&fh));
    match result {
        Ok(attrs) => {
            let attr = nfs3::fattr3::from(&attrs);
            debug!(" {:?} --> {:?}", xid, attr);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            attr.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_getattr error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
        }
    }
    Ok(())
}
