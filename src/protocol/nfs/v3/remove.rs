//! Implementation of the REMOVE procedure (procedure 12) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.12.
//!
//! The REMOVE procedure removes (deletes) an entry from a directory. The client specifies:
//! - The file handle of the directory containing the entry
//! - The name of the entry to remove
//!
//! Directories are refused with `ISDIR`; RMDIR removes those. The entry's
//! handle and shadowed attributes are forgotten along with it.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::failed_wcc;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles NFSv3 REMOVE procedure (procedure 12)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the directory handle and name
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_remove(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let dirops = deserialize::<nfs3::diropargs3>(input)?;
    debug!("nfsproc3_remove({:?}, {:?}) ", xid, dirops);

    let dir = match FileHandle::from_v3(&dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.remove(&dir, &dirops.name) {
        Ok(wcc) => {
            debug!("remove success {:?}", xid);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_remove error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
