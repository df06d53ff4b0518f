//! LOOKUP (procedure 4) and READLINK (procedure 5), RFC 1094 sections 2.2.5
//! and 2.2.6.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::reply_diropres;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::nfs3::nfsstat3;
use crate::protocol::xdr::{deserialize, nfs2, Serialize};

/// Resolves a name in a directory and returns its handle and attributes.
///
/// A handle is minted the first time a path is looked up.
pub fn nfsproc2_lookup(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::diropargs>(input)?;
    debug!("nfsproc2_lookup({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.dir);
    let result = match context.state.vfs.lookup(&dir, &args.name) {
        Ok((fh, attrs)) => {
            debug!("lookup success {:?} --> {:x}", xid, fh.id());
            Ok(nfs2::diropokres { file: fh.to_v2(), attributes: nfs2::fattr::from(&attrs) })
        }
        Err(stat) => {
            if stat != nfsstat3::NFS3ERR_NOENT {
                error!("nfsproc2_lookup error {:?} --> {:?}", xid, stat);
            }
            Err(nfs2::nfsstat::from(stat))
        }
    };
    reply_diropres(result, output)?;
    Ok(())
}

/// Returns a symbolic link's target as stored.
pub fn nfsproc2_readlink(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs2::fhandle>(input)?;
    let handle = FileHandle::from_v2(&handle);
    debug!("nfsproc2_readlink({:?},{:x}) ", xid, handle.id());

    match context.state.vfs.readlink(&handle) {
        Ok((target, _)) => {
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            target.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc2_readlink error {:?} --> {:?}", xid, stat);
            nfs2::nfsstat::from(stat).serialize(output)?;
        }
    }
    Ok(())
}
