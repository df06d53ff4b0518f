//! Implementation of the MKDIR procedure (procedure 9) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.9.
//!
//! The MKDIR procedure creates a new subdirectory. The client specifies:
//! - The file handle of the parent directory
//! - The name for the new directory
//! - The initial attributes for the new directory
//!
//! On successful return, the server provides:
//! - The file handle of the new directory
//! - The attributes of the new directory
//! - The attributes of the parent directory before and after the operation

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{failed_wcc, post_op_attr};
use crate::filetable::FileHandle;
use crate::fs_util::SetAttrs;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles NFSv3 MKDIR procedure (procedure 9)
pub fn nfsproc3_mkdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::dir::MKDIR3args>(input)?;
    debug!("nfsproc3_mkdir({:?}, {:?}) ", xid, args);

    let dir = match FileHandle::from_v3(&args.dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    let owner = context.owner();
    let attrs = SetAttrs::from(&args.attributes);
    match context.state.vfs.mkdir(&dir, &args.dirops.name, &attrs, owner) {
        Ok((fh, attrs, wcc)) => {
            debug!("mkdir success {:?} --> {:x}", xid, fh.id());
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            nfs3::post_op_fh3::Some(fh.to_v3()).serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_mkdir error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
