//! Implementation of the RENAME procedure (procedure 14) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.14.
//!
//! The RENAME procedure renames a file or directory. The client specifies:
//! - The file handle and name of the source entry
//! - The file handle and name of the destination entry
//!
//! On successful return, the server provides weak cache consistency data for
//! both directories.
//!
//! The renamed object keeps its file handle: every handle bound at or below
//! the old path is rebound to the new one, and the shadowed attributes move
//! to the destination directory's store.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::failed_wcc;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles NFSv3 RENAME procedure (procedure 14)
pub fn nfsproc3_rename(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::dir::RENAME3args>(input)?;
    debug!("nfsproc3_rename({:?}, {:?}) ", xid, args);

    let handles = FileHandle::from_v3(&args.from.dir)
        .and_then(|from| FileHandle::from_v3(&args.to.dir).map(|to| (from, to)));
    let (from_dir, to_dir) = match handles {
        Ok(pair) => pair,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    match context.state.vfs.rename(&from_dir, &args.from.name, &to_dir, &args.to.name) {
        Ok((from_wcc, to_wcc)) => {
            debug!("rename success {:?}", xid);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            from_wcc.to_v3().serialize(output)?;
            to_wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_rename error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &from_dir).serialize(output)?;
            failed_wcc(context, &to_dir).serialize(output)?;
        }
    }
    Ok(())
}
