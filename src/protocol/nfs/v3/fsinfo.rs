//! Implementation of the FSINFO procedure (procedure 19) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.19.
//!
//! The FSINFO procedure retrieves nonvolatile file system information, such as:
//! - Maximum and preferred read/write transfer sizes
//! - Maximum file size supported
//! - Time precision
//! - File system properties (links, symlinks, homogeneous PATHCONF, settable times)
//!
//! Clients typically call FSINFO right after MOUNT to size their requests.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{post_op_attr, TRANSFER_MAX};
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Preferred READDIR reply size.
const DIR_PREFERRED: u32 = 8192;

/// Handles NFSv3 FSINFO procedure (procedure 19)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the file handle
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_fsinfo(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_fsinfo({:?},{:?}) ", xid, handle);

    let result = FileHandle::from_v3(&handle).and_then(|fh| context.state.vfs.getattr(&fh));
    match result {
        Ok(attrs) => {
            let fsinfo = nfs3::fs::fsinfo3 {
                obj_attributes: post_op_attr(Some(attrs)),
                rtmax: TRANSFER_MAX,
                rtpref: TRANSFER_MAX,
                rtmult: 4096,
                wtmax: TRANSFER_MAX,
                wtpref: TRANSFER_MAX,
                wtmult: 4096,
                dtpref: DIR_PREFERRED,
                maxfilesize: u64::from(u32::MAX),
                time_delta: nfs3::nfstime3 { seconds: 0, nseconds: 1000 },
                properties: nfs3::fs::FSF_LINK
                    | nfs3::fs::FSF_SYMLINK
                    | nfs3::fs::FSF_HOMOGENEOUS
                    | nfs3::fs::FSF_CANSETTIME,
            };
            debug!(" {:?} --> {:?}", xid, fsinfo);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            fsinfo.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_fsinfo error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
        }
    }

    Ok(())
}
