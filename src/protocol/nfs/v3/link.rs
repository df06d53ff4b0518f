//! Implementation of the `LINK` procedure (procedure 15) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.15.
//!
//! Creates a host hard link and copies the target's shadowed attributes to
//! the new name.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{failed_wcc, post_op_attr};
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `LINK` procedure (procedure 15)
pub fn nfsproc3_link(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::file::LINK3args>(input)?;
    debug!("nfsproc3_link({:?}, {:?}) ", xid, args);

    let handles = FileHandle::from_v3(&args.file)
        .and_then(|file| FileHandle::from_v3(&args.link.dir).map(|dir| (file, dir)));
    let (file, dir) = match handles {
        Ok(pair) => pair,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.link(&file, &dir, &args.link.name) {
        Ok((attrs, wcc)) => {
            debug!("link success {:?}", xid);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_link error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&file)).serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
