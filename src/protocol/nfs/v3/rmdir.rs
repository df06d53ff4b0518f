//! Implementation of the `RMDIR` procedure (procedure 13) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.13.
//!
//! A directory whose only host entry is the attribute sidecar counts as
//! empty; the sidecar is deleted with it.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::failed_wcc;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `RMDIR` procedure (procedure 13)
///
/// `RMDIR` removes a directory entry that must refer to a directory.
pub fn nfsproc3_rmdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let dirops = deserialize::<nfs3::diropargs3>(input)?;
    debug!("nfsproc3_rmdir({:?}, {:?}) ", xid, dirops);

    let dir = match FileHandle::from_v3(&dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.rmdir(&dir, &dirops.name) {
        Ok(wcc) => {
            debug!("rmdir success {:?}", xid);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_rmdir error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
