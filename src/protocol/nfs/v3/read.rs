//! Implementation of the READ procedure (procedure 6) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.6.
//!
//! The READ procedure reads data from a regular file. The client specifies:
//! - The file handle of the file to read from
//! - The offset within the file to begin reading
//! - The number of bytes to read
//!
//! On successful return, the server provides:
//! - The attributes of the file after the read
//! - The number of bytes actually read
//! - A flag indicating whether the end of file was reached
//! - The data read from the file
//!
//! Requests larger than [`TRANSFER_MAX`] are clamped to it.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{post_op_attr, TRANSFER_MAX};
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};

/// Handles NFSv3 READ procedure (procedure 6)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the READ arguments
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_read(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::file::READ3args>(input)?;
    debug!("nfsproc3_read({:?},{:?}) ", xid, args);

    let handle = match FileHandle::from_v3(&args.file) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            return Ok(());
        }
    };
    let count = args.count.min(TRANSFER_MAX);
    match context.state.vfs.read(&handle, args.offset, count) {
        Ok(read) => {
            let res = nfs3::file::READ3resok {
                file_attributes: post_op_attr(Some(read.attrs)),
                count: read.data.len() as u32,
                eof: read.eof,
                data: read.data,
            };
            debug!(" {:?} --> read {} bytes, eof {}", xid, res.count, res.eof);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_read error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&handle)).serialize(output)?;
        }
    }
    Ok(())
}
