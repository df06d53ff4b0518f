//! Implementation of the WRITE procedure (procedure 7) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.7.
//!
//! The WRITE procedure writes data to a regular file. The client specifies:
//! - The file handle of the file to write to
//! - The offset within the file to begin writing
//! - The number of bytes to write
//! - The stability level required for the write
//! - The data to write
//!
//! `UNSTABLE` writes leave the host descriptor open until COMMIT; any other
//! level is synced before the reply and reported back as `FILE_SYNC`. The
//! reply carries the per-boot write verifier so a client can notice a server
//! restart between WRITE and COMMIT.

use std::io::{Read, Write};

use tracing::{debug, error, warn};

use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::Wcc;

/// Handles NFSv3 WRITE procedure (procedure 7)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the WRITE arguments
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_write(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::file::WRITE3args>(input)?;
    debug!(
        "nfsproc3_write({:?},{:?},offset {},count {},{:?}) ",
        xid, args.file, args.offset, args.count, args.stable
    );

    if args.data.len() != args.count as usize {
        warn!("write count {} does not match {} data bytes", args.count, args.data.len());
        nfs3::nfsstat3::NFS3ERR_INVAL.serialize(output)?;
        nfs3::wcc_data::default().serialize(output)?;
        return Ok(());
    }
    let handle = match FileHandle::from_v3(&args.file) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::wcc_data::default().serialize(output)?;
            return Ok(());
        }
    };

    let before = context.state.vfs.try_getattr(&handle);
    match context.state.vfs.write(&handle, args.offset, &args.data, args.stable) {
        Ok(written) => {
            let res = nfs3::file::WRITE3resok {
                file_wcc: Wcc { before, after: Some(written.attrs) }.to_v3(),
                count: written.count,
                committed: written.committed,
                verf: context.state.vfs.write_verifier(),
            };
            debug!("write success {:?} --> {} bytes {:?}", xid, res.count, res.committed);
            nfs3::nfsstat3::NFS3_OK.serialize(output)?;
            res.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc3_write error {:?} --> {:?}", xid, stat);
            let after = context.state.vfs.try_getattr(&handle);
            stat.serialize(output)?;
            Wcc { before, after }.to_v3().serialize(output)?;
        }
    }
    Ok(())
}
