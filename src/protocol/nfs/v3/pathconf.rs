//! Implementation of the PATHCONF procedure (procedure 20) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.20.
//!
//! The PATHCONF procedure retrieves the pathconf information for a file or
//! directory. The answers are the same for every object of the export.
//!
//! On successful return, the server provides:
//! - The file attributes for the file handle provided
//! - Maximum link count for a file (number of hard links)
//! - Maximum length for a file name
//! - Whether the file system enforces file name truncation or returns errors for long names
//! - Whether the file system restricts ownership changes
//! - Whether file names are case-insensitive
//! - Whether file names are case-preserving

use std::io::{Read, Write};

use tracing::{debug, error};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::NAME_MAX;

/// Handles NFSv3 PATHCONF procedure (procedure 20)
pub fn nfsproc3_pathconf(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_pathconf({:?},{:?})", xid, handle);

    let result = FileHandle::from_v3(&handle).and_then(|fh| context.state.vfs.getattr(&fh));
    match result {
        Ok(attrs) => {
            let res = nfs3::fs::PATHCONF3resok {
                obj_attributes: post_op_attr(Some(attrs)),
                linkmax: 0,
                name_max: NAME_MAX as u32,
                no_trunc: true,
                chown_restricted: true,
                case_insensitive: false,
                case_preserving: true,
            };
            debug!(" {:?} ---> {:?}", xid, res);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_pathconf error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
        }
    }
    Ok(())
}
