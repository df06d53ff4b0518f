//! Namespace procedures: REMOVE (10), RENAME (11), LINK (12), SYMLINK (13),
//! MKDIR (14) and RMDIR (15), RFC 1094 sections 2.2.11 to 2.2.16.
//!
//! All but MKDIR reply with a bare status.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{reply_diropres, reply_stat};
use crate::filetable::FileHandle;
use crate::fs_util::SetAttrs;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::nfs3::nfsstat3;
use crate::protocol::xdr::{deserialize, nfs2};

fn to_v2<T>(op: &str, xid: u32, result: Result<T, nfsstat3>) -> Result<T, nfs2::nfsstat> {
    result.map_err(|stat| {
        error!("nfsproc2_{} error {:?} --> {:?}", op, xid, stat);
        nfs2::nfsstat::from(stat)
    })
}

pub fn nfsproc2_remove(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::diropargs>(input)?;
    debug!("nfsproc2_remove({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.dir);
    let result = context.state.vfs.remove(&dir, &args.name).map(drop);
    reply_stat(to_v2("remove", xid, result), output)?;
    Ok(())
}

/// The renamed object keeps its handle.
pub fn nfsproc2_rename(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::renameargs>(input)?;
    debug!("nfsproc2_rename({:?},{:?}) ", xid, args);

    let from_dir = FileHandle::from_v2(&args.from.dir);
    let to_dir = FileHandle::from_v2(&args.to.dir);
    let result = context
        .state
        .vfs
        .rename(&from_dir, &args.from.name, &to_dir, &args.to.name)
        .map(drop);
    reply_stat(to_v2("rename", xid, result), output)?;
    Ok(())
}

pub fn nfsproc2_link(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::linkargs>(input)?;
    debug!("nfsproc2_link({:?},{:?}) ", xid, args);

    let file = FileHandle::from_v2(&args.from);
    let dir = FileHandle::from_v2(&args.to.dir);
    let result = context.state.vfs.link(&file, &dir, &args.to.name).map(drop);
    reply_stat(to_v2("link", xid, result), output)?;
    Ok(())
}

pub fn nfsproc2_symlink(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::symlinkargs>(input)?;
    debug!("nfsproc2_symlink({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.from.dir);
    let attrs = SetAttrs::from(&args.attributes);
    let owner = context.owner();
    let result =
        context.state.vfs.symlink(&dir, &args.from.name, &args.to, &attrs, owner).map(drop);
    reply_stat(to_v2("symlink", xid, result), output)?;
    Ok(())
}

pub fn nfsproc2_mkdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::createargs>(input)?;
    debug!("nfsproc2_mkdir({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.dirops.dir);
    let attrs = SetAttrs::from(&args.attributes);
    let owner = context.owner();
    let result = context
        .state
        .vfs
        .mkdir(&dir, &args.dirops.name, &attrs, owner)
        .map(|(fh, attrs, _)| nfs2::diropokres {
            file: fh.to_v2(),
            attributes: nfs2::fattr::from(&attrs),
        });
    reply_diropres(to_v2("mkdir", xid, result), output)?;
    Ok(())
}

pub fn nfsproc2_rmdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::diropargs>(input)?;
    debug!("nfsproc2_rmdir({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.dir);
    let result = context.state.vfs.rmdir(&dir, &args.name).map(drop);
    reply_stat(to_v2("rmdir", xid, result), output)?;
    Ok(())
}
