//! Implementation of the `FSSTAT` procedure (procedure 18) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.18.
//!
//! Figures come straight from `statvfs` on the host directory behind the
//! handle and are reported as volatile (`invarsec` of zero).

use std::io::{Read, Write};

use tracing::{debug, error};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles `NFSv3` `FSSTAT` procedure (procedure 18)
pub fn nfsproc3_fsstat(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs3::nfs_fh3>(input)?;
    debug!("nfsproc3_fsstat({:?},{:?}) ", xid, handle);

    let result = FileHandle::from_v3(&handle).and_then(|fh| context.state.vfs.statfs(&fh));
    match result {
        Ok((stats, attrs)) => {
            let res = nfs3::fs::FSSTAT3resok {
                obj_attributes: post_op_attr(Some(attrs)),
                tbytes: stats.blocks.saturating_mul(stats.block_size),
                fbytes: stats.blocks_free.saturating_mul(stats.block_size),
                abytes: stats.blocks_avail.saturating_mul(stats.block_size),
                tfiles: stats.files,
                ffiles: stats.files_free,
                afiles: stats.files_avail,
                invarsec: 0,
            };
            debug!(" {:?} --> {:?}", xid, res);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_fsstat error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
        }
    }
    Ok(())
}
