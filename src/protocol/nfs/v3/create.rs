//! Implementation of the CREATE procedure (procedure 8) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.8.
//!
//! The CREATE procedure creates a regular file in a specified directory.
//! The client specifies:
//! - The file handle of the parent directory
//! - The name for the new file
//! - The method of creation (UNCHECKED, GUARDED, or EXCLUSIVE)
//! - The initial attributes for the new file (for UNCHECKED and GUARDED modes)
//! - A creation verifier (for EXCLUSIVE mode)
//!
//! The three creation methods are:
//! - UNCHECKED: Creates the file or updates attributes if it exists
//! - GUARDED: Creates the file only if it doesn't exist
//! - EXCLUSIVE: Creates the file only if it doesn't exist. The verifier is not
//!   stored, so a retransmitted EXCLUSIVE CREATE reports `EXIST`.
//!
//! Ownership of the new file comes from the sattr3 if given, else from the
//! caller's AUTH_UNIX credentials, and is recorded in the shadow store only.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{failed_wcc, post_op_attr};
use crate::filetable::FileHandle;
use crate::fs_util::SetAttrs;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::CreateMode;

/// Handles NFSv3 CREATE procedure (procedure 8)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the CREATE arguments
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_create(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::file::CREATE3args>(input)?;
    debug!("nfsproc3_create({:?}, {:?}) ", xid, args);

    let (how, attrs) = match args.how {
        nfs3::file::createhow3::UNCHECKED(attr) => (CreateMode::Unchecked, SetAttrs::from(&attr)),
        nfs3::file::createhow3::GUARDED(attr) => (CreateMode::Guarded, SetAttrs::from(&attr)),
        nfs3::file::createhow3::EXCLUSIVE(_) => (CreateMode::Exclusive, SetAttrs::default()),
    };
    let dir = match FileHandle::from_v3(&args.dirops.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    let owner = context.owner();
    match context.state.vfs.create(&dir, &args.dirops.name, how, &attrs, None, owner) {
        Ok((fh, attrs, wcc)) => {
            debug!("create success {:?} --> {:x}", xid, fh.id());
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            nfs3::post_op_fh3::Some(fh.to_v3()).serialize(output)?;
            post_op_attr(Some(attrs)).serialize(output)?;
            wcc.to_v3().serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_create error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            failed_wcc(context, &dir).serialize(output)?;
        }
    }
    Ok(())
}
