//! Implementation of the `SETATTR` procedure (procedure 2) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.2.
//!
//! Mode and ownership land in the attribute shadow store; size and times are
//! applied to the host object. A mode change also reaches the host, with the
//! owner write bit kept on so the server can go on writing the file.
//!
//! With a guard, the object's current ctime must equal the guard time or the
//! call fails with `NOT_SYNC` and changes nothing.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::failed_wcc;
use crate::filetable::FileHandle;
use crate::fs_util::{SetAttrs, Timestamp};
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `SETATTR` procedure (procedure 2)
///
/// Replies with the object's weak cache consistency data in both the success
/// and the failure case.
pub fn nfsproc3_setattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::SETATTR3args>(input)?;
    debug!("nfsproc3_setattr({:?},{:?}) ", xid, args);

    let attrs = SetAttrs::from(&args.new_attribute);
    let guard = args.guard.map(|t| Timestamp { seconds: t.seconds, nseconds: t.nseconds });
    let handle = match FileHandle::from_v3(&args.object) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.setattr(&handle, &attrs, guard) {
        Ok(wcc) => {
            debug!(" setattr {:?} --> {:?}", xid, wcc.after);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_setattr error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &handle).serialize(output)?;
        }
    }
    Ok(())
}
