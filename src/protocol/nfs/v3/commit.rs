//! Implementation of the COMMIT procedure (procedure 21) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.21.
//!
//! Syncs and closes the descriptor left open by earlier `UNSTABLE` writes to
//! the file. The offset and count are ignored: the whole file is committed.
//! A COMMIT with no pending writes succeeds without touching the host.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::failed_wcc;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::Wcc;

/// Handles NFSv3 COMMIT procedure (procedure 21)
pub fn nfsproc3_commit(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::file::COMMIT3args>(input)?;
    debug!("nfsproc3_commit({:?},{:?}) ", xid, args);

    let handle = match FileHandle::from_v3(&args.file) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };
    let before = context.state.vfs.try_getattr(&handle);
    match context.state.vfs.commit(&handle) {
        Ok(attrs) => {
            let res = nfs3::file::COMMIT3resok {
                file_wcc: Wcc { before, after: Some(attrs) }.to_v3(),
                verf: context.state.vfs.write_verifier(),
            };
            debug!(" {:?} --> {:?}", xid, res);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_commit error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &handle).serialize(output)?;
        }
    }
    Ok(())
}
