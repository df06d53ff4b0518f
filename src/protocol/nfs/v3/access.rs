//! Implementation of the ACCESS procedure (procedure 4) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.4.
//!
//! The ACCESS procedure determines the access rights that a user, as identified
//! by the authentication credentials, has with respect to a file system object.
//!
//! Credentials are not checked: rights depend only on the object type and on
//! whether the export is read-only.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles NFSv3 ACCESS procedure (procedure 4)
///
/// ACCESS determines the access rights a user has to a file system object.
/// Takes a file handle and a bit mask of requested rights; returns the
/// subset granted together with the object's attributes.
pub fn nfsproc3_access(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    let requested = deserialize::<u32>(input)?;
    debug!("nfsproc3_access({:?},{:?},{:?})", xid, handle, requested);

    let result = FileHandle::from_v3(&handle)
        .and_then(|fh| context.state.vfs.access(&fh, requested));
    match result {
        Ok((granted, attrs)) => {
            debug!(" {:?} ---> {:?}", xid, granted);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            granted.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_access error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
        }
    }
    Ok(())
}
