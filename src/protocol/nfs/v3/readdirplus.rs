//! Implementation of the `READDIRPLUS` procedure (procedure 17) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.17.
//!
//! The `READDIRPLUS` procedure is an extended version of READDIR that returns
//! file handles and attributes in addition to directory entries. This procedure
//! is intended to eliminate separate LOOKUP calls for clients that want to
//! get attributes and file handles for directory entries.
//!
//! The client specifies:
//! - The file handle of the directory to read
//! - A cookie indicating where to start reading in the directory
//! - A cookie verifier to validate the cookie
//! - The maximum size of directory information to return
//! - The maximum size of the whole reply
//!
//! On successful return, the server provides:
//! - The directory attributes
//! - A list of entries, each containing:
//!   * The file identifier (fileid)
//!   * The filename
//!   * A cookie for retrieving the next batch of entries
//!   * The file attributes
//!   * The file handle
//! - A flag indicating whether the end of the directory was reached
//!
//! Cookies follow the same ordinal scheme as READDIR. Handles returned here
//! are minted just as LOOKUP would mint them.

use std::io::{Read, Write};

use tracing::{debug, error, trace};

use super::post_op_attr;
use super::readdir::REPLY_OVERHEAD;
use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs3, Serialize};
use crate::vfs::COOKIE_VERIFIER;
use crate::write_counter::WriteCounter;

/// Handles `NFSv3` `READDIRPLUS` procedure (procedure 17)
///
/// `dircount` bounds the bytes of fileid, name and cookie alone; `maxcount`
/// bounds the whole reply. The batch stops at the first entry that would
/// overflow either.
pub fn nfsproc3_readdirplus(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs3::dir::READDIRPLUS3args>(input)?;
    debug!("nfsproc3_readdirplus({:?},{:?}) ", xid, args);

    let dir = match FileHandle::from_v3(&args.dir) {
        Ok(fh) => fh,
        Err(stat) => {
            stat.serialize(output)?;
            nfs3::post_op_attr::None.serialize(output)?;
            return Ok(());
        }
    };
    let listing = match context.state.vfs.readdir(&dir, args.cookie, true) {
        Ok(listing) => listing,
        Err(stat) => {
            error!("readdir error {:?} --> {:?} ", xid, stat);
            stat.serialize(output)?;
            post_op_attr(context.state.vfs.try_getattr(&dir)).serialize(output)?;
            return Ok(());
        }
    };
    let dir_attr = post_op_attr(context.state.vfs.try_getattr(&dir));

    let max_bytes_allowed = (args.maxcount as usize).saturating_sub(REPLY_OVERHEAD);
    let max_dircount_bytes = args.dircount as usize;
    // we count dir_count seperately as it is just a subset of fields
    let mut accumulated_dircount: usize = 0;
    let mut all_entries_written = true;
    let mut ctr = 0;

    let mut body = WriteCounter::new(Vec::new());
    dir_attr.serialize(&mut body)?;
    COOKIE_VERIFIER.serialize(&mut body)?;
    for entry in &listing.entries {
        let entry = nfs3::dir::entryplus3 {
            fileid: entry.fileid,
            name: entry.name.as_slice().into(),
            cookie: entry.cookie,
            name_attributes: post_op_attr(entry.attrs),
            name_handle: entry.handle.map(|fh| fh.to_v3()),
        };
        // write the entry into a buffer first
        let mut write_buf: Vec<u8> = Vec::new();
        true.serialize(&mut write_buf)?;
        entry.serialize(&mut write_buf)?;
        let added_dircount = std::mem::size_of::<nfs3::fileid3>()   // fileid
            + std::mem::size_of::<u32>() + entry.name.len()          // name
            + std::mem::size_of::<nfs3::cookie3>(); // cookie
        if body.bytes_written() + write_buf.len() > max_bytes_allowed
            || accumulated_dircount + added_dircount > max_dircount_bytes
        {
            trace!(" -- insufficient space. truncating");
            all_entries_written = false;
            break;
        }
        trace!("  -- dirent {:?}", entry);
        body.write_all(&write_buf)?;
        accumulated_dircount += added_dircount;
        ctr += 1;
        trace!(
            "  -- lengths: {:?} / {:?} {:?} / {:?}",
            accumulated_dircount,
            max_dircount_bytes,
            body.bytes_written(),
            max_bytes_allowed
        );
    }

    if ctr == 0 && !listing.entries.is_empty() {
        debug!("readdirplus {:?}: limits {}/{} hold no entry", xid, args.dircount, args.maxcount);
        nfs3::nfsstat3::NFS3ERR_TOOSMALL.serialize(output)?;
        dir_attr.serialize(output)?;
        return Ok(());
    }
    // false flag for the final entryplus* linked list
    false.serialize(&mut body)?;
    // eof flag is only valid here if we wrote everything
    let eof = listing.eof && all_entries_written;
    eof.serialize(&mut body)?;
    debug!(
        "readdirplus {:x}, start at {}, flushing {} entries, eof {}",
        dir.id(),
        args.cookie,
        ctr,
        eof
    );

    nfs3::nfsstat3::NFS3_OK.serialize(output)?;
    output.write_all(&body.into_inner())?;
    Ok(())
}
