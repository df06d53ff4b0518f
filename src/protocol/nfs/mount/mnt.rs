//! MOUNTPROC_MNT (procedure 1).
//!
//! The requested path must be the export name or lie below it. Versions 1
//! and 2 reply with an `fhstatus` carrying a fixed 32-byte handle; version 3
//! replies with a `mountres3` carrying the 64-byte handle and the accepted
//! auth flavors.

use std::io::{Read, Write};

use tracing::{debug, info};

use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::mount::{self, mountstat3};
use crate::protocol::xdr::nfs3::nfsstat3;
use crate::protocol::xdr::rpc::auth_flavor;
use crate::protocol::xdr::{read_opaque_max, Serialize};

/// Part of `path` below `export`, or `None` if `path` is outside it.
fn export_relative<'a>(path: &'a str, export: &str) -> Option<&'a str> {
    let export = export.trim_end_matches('/');
    let rest = path.strip_prefix(export)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(rest.trim_matches('/'))
}

fn mount_status(stat: nfsstat3) -> mountstat3 {
    match stat {
        nfsstat3::NFS3ERR_NOENT | nfsstat3::NFS3ERR_STALE => mountstat3::MNT3ERR_NOENT,
        nfsstat3::NFS3ERR_ACCES => mountstat3::MNT3ERR_ACCES,
        nfsstat3::NFS3ERR_PERM => mountstat3::MNT3ERR_PERM,
        nfsstat3::NFS3ERR_NOTDIR => mountstat3::MNT3ERR_NOTDIR,
        nfsstat3::NFS3ERR_NAMETOOLONG => mountstat3::MNT3ERR_NAMETOOLONG,
        nfsstat3::NFS3ERR_INVAL => mountstat3::MNT3ERR_INVAL,
        _ => mountstat3::MNT3ERR_IO,
    }
}

/// Handles MOUNTPROC_MNT
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the directory path
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn mountproc_mnt(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let path = read_opaque_max(input, mount::MNTPATHLEN)?;
    let path = String::from_utf8_lossy(&path).into_owned();
    debug!("mountproc_mnt({:?},{:?}) ", xid, path);

    let Some(relative) = export_relative(&path, &context.state.export_name) else {
        debug!("{:?} --> no matching export", xid);
        mountstat3::MNT3ERR_NOENT.serialize(output)?;
        return Ok(());
    };
    let handle = match context.state.vfs.directory_handle(relative.as_bytes()) {
        Ok(handle) => handle,
        Err(stat) => {
            debug!("{:?} --> {:?}", xid, stat);
            mount_status(stat).serialize(output)?;
            return Ok(());
        }
    };

    let client = context.client_name();
    info!("{} mounted {}", client, path);
    context.state.mounts.add(&client, &path);
    mountstat3::MNT3_OK.serialize(output)?;
    write_handle(handle, context.vers, output)?;
    Ok(())
}

fn write_handle(handle: FileHandle, vers: u32, output: &mut impl Write) -> std::io::Result<()> {
    if vers < 3 {
        return handle.to_v2().serialize(output);
    }
    let response = mount::mountres3_ok {
        fhandle: handle.to_v3().data,
        auth_flavors: vec![auth_flavor::AUTH_NULL as u32, auth_flavor::AUTH_UNIX as u32],
    };
    response.serialize(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_below_the_export_are_accepted() {
        assert_eq!(export_relative("/export", "/export"), Some(""));
        assert_eq!(export_relative("/export/", "/export"), Some(""));
        assert_eq!(export_relative("/export/usr/lib", "/export/"), Some("usr/lib"));
        assert_eq!(export_relative("/exported", "/export"), None);
        assert_eq!(export_relative("/other", "/export"), None);
    }
}
