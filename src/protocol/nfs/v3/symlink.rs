//! Implementation of the `SYMLINK` procedure (procedure 10) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.10.
//!
//! The target is stored verbatim. The link's mode and ownership go to the
//! shadow store; the host link keeps whatever the host gives symlinks.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{failed_wcc, post_op_attr};
use crate::filetable::FileHandle;
use crate::fs_util::SetAttrs;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `SYMLINK` procedure (procedure 10)
pub fn nfsproc3_symlink(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::dir::SYMLINK3args>(input)?;
    debug!("nfsproc3_symlink({:?}, {:?}) ", xid, args);

    let dir = match FileHandle::from_v3(&args.dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    let owner = context.owner();
    let attrs = SetAttrs::from(&args.symlink.symlink_attributes);
    let result = context.state.vfs.symlink(
        &dir,
        &args.dirops.name,
        &args.symlink.symlink_data,
        &attrs,
        owner,
    );
    match result {
        Ok((fh, attrs, wcc)) => {
            debug!("symlink success {:?} --> {:x}", xid, fh.id());
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            nfs3::post_op_fh3::Some(fh.to_v3()).serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_symlink error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
