//! NFSv3 (Network File System version 3) protocol implementation as specified in RFC 1813.
//!
//! The procedures served here:
//!
//! 1. NULL - Do nothing (ping the server)
//! 2. GETATTR - Get file attributes
//! 3. SETATTR - Set file attributes
//! 4. LOOKUP - Look up file name
//! 5. ACCESS - Check access permission
//! 6. READLINK - Read from symbolic link
//! 7. READ - Read from file
//! 8. WRITE - Write to file
//! 9. CREATE - Create a file
//! 10. MKDIR - Create a directory
//! 11. SYMLINK - Create a symbolic link
//! 12. MKNOD - Create a special device (always `NOTSUPP`; NFSv2 CREATE makes device nodes)
//! 13. REMOVE - Remove a file
//! 14. RMDIR - Remove a directory
//! 15. RENAME - Rename a file or directory
//! 16. LINK - Create a hard link
//! 17. READDIR - Read from directory
//! 18. READDIRPLUS - Extended read from directory
//! 19. FSSTAT - Get file system statistics
//! 20. FSINFO - Get file system information
//! 21. PATHCONF - Get path configuration
//! 22. COMMIT - Commit cached data
//!
//! Each procedure lives in its own module. Handlers decode their arguments,
//! call into [`crate::vfs::Vfs`] and encode the status first, then the
//! procedure's attributes and results. A failure never aborts the reply: it
//! becomes an `nfsstat3` plus whatever post-operation attributes are known.

use std::io::{Read, Write};

use num_traits::cast::FromPrimitive;

use crate::filetable::FileHandle;
use crate::fs_util::FileAttrs;
use crate::protocol::rpc::{self, ProcError, ProcResult};
use crate::protocol::xdr::nfs3;
use crate::vfs::Wcc;

mod access;
mod commit;
mod create;
mod fsinfo;
mod fsstat;
mod getattr;
mod link;
mod lookup;
mod mkdir;
mod mknod;
mod null;
mod pathconf;
mod read;
mod readdir;
mod readdirplus;
mod readlink;
mod remove;
mod rename;
mod rmdir;
mod setattr;
mod symlink;
mod write;

use access::nfsproc3_access;
use commit::nfsproc3_commit;
use create::nfsproc3_create;
use fsinfo::nfsproc3_fsinfo;
use fsstat::nfsproc3_fsstat;
use getattr::nfsproc3_getattr;
use link::nfsproc3_link;
use lookup::nfsproc3_lookup;
use mkdir::nfsproc3_mkdir;
use mknod::nfsproc3_mknod;
use null::nfsproc3_null;
use pathconf::nfsproc3_pathconf;
use read::nfsproc3_read;
use readdir::nfsproc3_readdir;
use readdirplus::nfsproc3_readdirplus;
use readlink::nfsproc3_readlink;
use remove::nfsproc3_remove;
use rename::nfsproc3_rename;
use rmdir::nfsproc3_rmdir;
use setattr::nfsproc3_setattr;
use symlink::nfsproc3_symlink;
use write::nfsproc3_write;

/// Largest READ and WRITE payload the server accepts and advertises.
pub const TRANSFER_MAX: u32 = 32768;

/// Wire form of optional attributes.
fn post_op_attr(attrs: Option<FileAttrs>) -> nfs3::post_op_attr {
    attrs.as_ref().map(nfs3::fattr3::from)
}

/// `wcc_data` for a failed mutation: only the current attributes are known.
fn failed_wcc(context: &mut rpc::Context<'_>, handle: &FileHandle) -> nfs3::wcc_data {
    Wcc { before: None, after: context.state.vfs.try_getattr(handle) }.to_v3()
}

/// Dispatches an NFSv3 call to its procedure handler.
///
/// Procedure numbers outside the table report [`ProcError::NotImplemented`],
/// which the dispatcher turns into `PROC_UNAVAIL`.
pub fn handle_nfs3(
    proc: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let xid = context.xid;
    let Some(prog) = nfs3::NFSProgram::from_u32(proc) else {
        return Err(ProcError::NotImplemented);
    };

    match prog {
        nfs3::NFSProgram::NFSPROC3_NULL => nfsproc3_null(xid, input, output),
        nfs3::NFSProgram::NFSPROC3_GETATTR => nfsproc3_getattr(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_SETATTR => nfsproc3_setattr(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_LOOKUP => nfsproc3_lookup(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_ACCESS => nfsproc3_access(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_READLINK => nfsproc3_readlink(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_READ => nfsproc3_read(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_WRITE => nfsproc3_write(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_CREATE => nfsproc3_create(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_MKDIR => nfsproc3_mkdir(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_SYMLINK => nfsproc3_symlink(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_MKNOD => nfsproc3_mknod(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_REMOVE => nfsproc3_remove(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_RMDIR => nfsproc3_rmdir(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_RENAME => nfsproc3_rename(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_LINK => nfsproc3_link(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_READDIR => nfsproc3_readdir(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_READDIRPLUS => {
            nfsproc3_readdirplus(xid, input, output, context)
        }
        nfs3::NFSProgram::NFSPROC3_FSSTAT => nfsproc3_fsstat(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_FSINFO => nfsproc3_fsinfo(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_PATHCONF => nfsproc3_pathconf(xid, input, output, context),
        nfs3::NFSProgram::NFSPROC3_COMMIT => nfsproc3_commit(xid, input, output, context),
    }
}
