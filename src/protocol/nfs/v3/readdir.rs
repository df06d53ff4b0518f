//! Implementation of the `READDIR` procedure (procedure 16) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.16.
//!
//! The client specifies:
//! - The file handle of the directory to read
//! - A cookie indicating where to start reading in the directory
//! - A cookie verifier to validate the cookie
//! - The maximum size in bytes of the reply
//!
//! Cookies are ordinals into the listing `.`, `..`, then the host entries
//! sorted by name. The listing is rebuilt on every call, so a cookie stays
//! meaningful as long as the directory does not change between calls. The
//! verifier is always zero and never checked, and `BAD_COOKIE` is never
//! returned. At most [`READDIR_BATCH`] entries come back per call; `eof`
//! is only set when the listing is exhausted and everything fitted.

use std::io::{Read, Write};

use tracing::{debug, error, trace};

use super::post_op_attr;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::{COOKIE_VERIFIER, READDIR_BATCH};
use crate::write_counter::WriteCounter;

/// Room left for the RPC reply header, the status and the list terminator.
pub(super) const REPLY_OVERHEAD: usize = 128;

/// Handles `NFSv3` `READDIR` procedure (procedure 16)
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the `READDIR` arguments
/// * `output` - Output stream for writing the response
/// * `context` - Call context holding the server state
pub fn nfsproc3_readdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::dir::READDIR3args>(input)?;
    debug!("nfsproc3_readdir({:?},{:?}) ", xid, args);

    let dir = match FileHandle::from_v3(&args.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            return Ok(());
        }
    };
    let listing = match context.state.vfs.readdir(&dir, args.cookie, false) {
        Ok(listing) => listing,
        Err(stat) => {
            error!("nfsproc3_readdir error {:?} --> {:?}", xid, stat);
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&dir)).serialize(output)?;
            return Ok(());
        }
    };
    let dir_attr = post_op_attr(context.state.vfs.try_getattr(&dir));

    // `count` bounds the whole READDIR3resok.
    let max_bytes_allowed = (args.dircount as usize).saturating_sub(REPLY_OVERHEAD);
    let mut body = WriteCounter::new(Vec::new());
    dir_attr.serialize(&mut body)?;
    COOKIE_VERIFIER.serialize(&mut body)?;

    let mut ctr = 0;
    let mut all_entries_written = true;
    for entry in &listing.entries {
        let entry = nfs3::dir::entry3 {
            fileid: entry.fileid,
            name: entry.name.as_slice().into(),
            cookie: entry.cookie,
        };
        let mut write_buf: Vec<u8> = Vec::new();
        // true flag for the entry3* to mark that this contains an entry
        true.serialize(&mut write_buf)?;
        entry.serialize(&mut write_buf)?;
        if body.bytes_written() + write_buf.len() > max_bytes_allowed {
            trace!(" -- insufficient space. truncating");
            all_entries_written = false;
            break;
        }
        trace!("  -- dirent {:?}", entry);
        body.write_all(&write_buf)?;
        ctr += 1;
    }

    if ctr == 0 && !listing.entries.is_empty() {
        debug!("readdir {:?}: {} bytes hold no entry", xid, args.dircount);
        nfs3::nfsstat3::NFS3ERR_TOOSMALL.serialize(output)?;
        dir_attr.serialize(output)?;
        return Ok(());
    }
    // false flag for the final entry3* linked list
    false.serialize(&mut body)?;
    let eof = listing.eof && all_entries_written;
    eof.serialize(&mut body)?;
    debug!(
        "readdir {:x}, start at {}, flushing {} of at most {} entries, eof {}",
        dir.id(),
        args.cookie,
        ctr,
        READDIR_BATCH,
        eof
    );

    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    output.write_all(&body.into_inner())?;
    Ok(())
}
