//! NFSv2 protocol implementation as specified in RFC 1094.
//!
//! Version 2 is what older guest kernels speak. Its procedures map onto the
//! same [`crate::vfs::Vfs`] operations as version 3; the differences are on
//! the wire: fixed 32-byte handles, 32-bit sizes and offsets, 4-byte READDIR
//! cookies, and a smaller status set (v3-only codes collapse to `NFSERR_IO`).
//!
//! Procedures are grouped by what they touch:
//! - `attr`: GETATTR, SETATTR
//! - `lookup`: LOOKUP, READLINK
//! - `file`: READ, WRITE, CREATE
//! - `dir`: REMOVE, RENAME, LINK, SYMLINK, MKDIR, RMDIR
//! - `readdir`: READDIR
//! - `statfs`: STATFS
//!
//! ROOT and WRITECACHE are obsolete and answer `PROC_UNAVAIL`.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;
use tracing::debug;

use crate::fs_util::FileAttrs;
use crate::protocol::rpc::{self, ProcError, ProcResult};
use crate::protocol::xdr::nfs2::{self, NFSProgram};
use crate::protocol::xdr::Serialize;

mod attr;
mod dir;
mod file;
mod lookup;
mod readdir;
mod statfs;

/// Writes an `attrstat`: the status, then the attributes on success.
fn reply_attrstat(
    result: Result<FileAttrs, nfs2::nfsstat>,
    output: &mut impl Write,
) -> std::io::Result<()> {
    match result {
        Ok(attrs) => {
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            nfs2::fattr::from(&attrs).serialize(output)
        }
        Err(stat) => stat.serialize(output),
    }
}

/// Writes a `diropres`: the status, then handle and attributes on success.
fn reply_diropres(
    result: Result<nfs2::diropokres, nfs2::nfsstat>,
    output: &mut impl Write,
) -> std::io::Result<()> {
    match result {
        Ok(res) => {
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            res.serialize(output)
        }
        Err(stat) => stat.serialize(output),
    }
}

/// Writes a bare `nfsstat` reply.
fn reply_stat(result: Result<(), nfs2::nfsstat>, output: &mut impl Write) -> std::io::Result<()> {
    match result {
        Ok(()) => nfs2::nfsstat::NFS_OK.serialize(output),
        Err(stat) => stat.serialize(output),
    }
}

/// Dispatches an NFSv2 call to its procedure handler.
pub fn handle_nfs2(
    proc: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let xid = context.xid;
    let Some(prog) = NFSProgram::from_u32(proc) else {
        return Err(ProcError::NotImplemented);
    };

    match prog {
        NFSProgram::NFSPROC_NULL => {
            debug!("nfsproc2_null({:?}) ", xid);
            Ok(())
        }
        NFSProgram::NFSPROC_GETATTR => attr::nfsproc2_getattr(xid, input, output, context),
        NFSProgram::NFSPROC_SETATTR => attr::nfsproc2_setattr(xid, input, output, context),
        NFSProgram::NFSPROC_LOOKUP => lookup::nfsproc2_lookup(xid, input, output, context),
        NFSProgram::NFSPROC_READLINK => lookup::nfsproc2_readlink(xid, input, output, context),
        NFSProgram::NFSPROC_READ => file::nfsproc2_read(xid, input, output, context),
        NFSProgram::NFSPROC_WRITE => file::nfsproc2_write(xid, input, output, context),
        NFSProgram::NFSPROC_CREATE => file::nfsproc2_create(xid, input, output, context),
        NFSProgram::NFSPROC_REMOVE => dir::nfsproc2_remove(xid, input, output, context),
        NFSProgram::NFSPROC_RENAME => dir::nfsproc2_rename(xid, input, output, context),
        NFSProgram::NFSPROC_LINK => dir::nfsproc2_link(xid, input, output, context),
        NFSProgram::NFSPROC_SYMLINK => dir::nfsproc2_symlink(xid, input, output, context),
        NFSProgram::NFSPROC_MKDIR => dir::nfsproc2_mkdir(xid, input, output, context),
        NFSProgram::NFSPROC_RMDIR => dir::nfsproc2_rmdir(xid, input, output, context),
        NFSProgram::NFSPROC_READDIR => readdir::nfsproc2_readdir(xid, input, output, context),
        NFSProgram::NFSPROC_STATFS => statfs::nfsproc2_statfs(xid, input, output, context),
        NFSProgram::NFSPROC_ROOT | NFSProgram::NFSPROC_WRITECACHE => {
            debug!("nfsproc2 obsolete procedure {:?} (xid {})", prog, xid);
            Err(ProcError::NotImplemented)
        }
    }
}
