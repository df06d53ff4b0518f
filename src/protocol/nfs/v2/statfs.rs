//! STATFS (procedure 17), RFC 1094 section 2.2.18.
//!
//! Host `statvfs` figures, clamped to 32 bits.

use std::io::{Read, Write};

use tracing::{debug, error};

use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs2, Serialize};

fn clamp(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

pub fn nfsproc2_statfs(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs2::fhandle>(input)?;
    let handle = FileHandle::from_v2(&handle);
    debug!("nfsproc2_statfs({:?},{:x}) ", xid, handle.id());

    match context.state.vfs.statfs(&handle) {
        Ok((stats, _)) => {
            let res = nfs2::statfsokres {
                tsize: nfs2::MAXDATA,
                bsize: clamp(stats.block_size),
                blocks: clamp(stats.blocks),
                bfree: clamp(stats.blocks_free),
                bavail: clamp(stats.blocks_avail),
            };
            debug!(" {:?} --> {:?}", xid, res);
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc2_statfs error {:?} --> {:?}", xid, stat);
            nfs2::nfsstat::from(stat).serialize(output)?;
        }
    }
    Ok(())
}
