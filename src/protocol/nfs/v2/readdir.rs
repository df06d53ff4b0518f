//! READDIR (procedure 16), RFC 1094 section 2.2.17.
//!
//! The 4-byte cookie holds a big-endian ordinal into the listing `.`, `..`,
//! then the host entries sorted by name; each entry's cookie is the ordinal
//! of the entry after it. At most [`READDIR_BATCH`] entries are returned per
//! call, fewer if `count` bytes cannot hold them. The first entry is sent
//! even when it alone overflows `count`, so a client always makes progress.
//! `eof` is set only when the listing is exhausted and every remaining entry
//! was sent.

use std::io::{Read, Write};

use tracing::{debug, error, trace};

use crate::filetable::FileHandle;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs2, Serialize};
use crate::vfs::READDIR_BATCH;
use crate::write_counter::WriteCounter;

/// Status, list terminator and eof flag.
const REPLY_FIXED: usize = 12;

pub fn nfsproc2_readdir(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::readdirargs>(input)?;
    let cookie = u32::from_be_bytes(args.cookie);
    debug!("nfsproc2_readdir({:?},{:?},cookie {}) ", xid, args.dir, cookie);

    let dir = FileHandle::from_v2(&args.dir);
    let listing = match context.state.vfs.readdir(&dir, u64::from(cookie), false) {
        Ok(listing) => listing,
        Err(stat) => {
            error!("nfsproc2_readdir error {:?} --> {:?}", xid, stat);
            nfs2::nfsstat::from(stat).serialize(output)?;
            return Ok(());
        }
    };

    let max_bytes_allowed = (args.count as usize).saturating_sub(REPLY_FIXED);
    let mut body = WriteCounter::new(Vec::new());
    let mut all_entries_written = true;
    for entry in &listing.entries {
        let entry = nfs2::entry {
            fileid: (entry.fileid ^ (entry.fileid >> 32)) as u32,
            name: entry.name.as_slice().into(),
            cookie: (entry.cookie as u32).to_be_bytes(),
        };
        let mut write_buf: Vec<u8> = Vec::new();
        true.serialize(&mut write_buf)?;
        entry.serialize(&mut write_buf)?;
        let first = body.bytes_written() == 0;
        if !first && body.bytes_written() + write_buf.len() > max_bytes_allowed {
            trace!(" -- insufficient space. truncating");
            all_entries_written = false;
            break;
        }
        trace!("  -- dirent {:?}", entry);
        body.write_all(&write_buf)?;
    }
    let eof = listing.eof && all_entries_written;
    debug!(
        "readdir {:x}, start at {}, {} bytes of entries (batch {}), eof {}",
        dir.id(),
        cookie,
        body.bytes_written(),
        READDIR_BATCH,
        eof
    );

    nfs2::nfsstat::NFS_OK.serialize(output)?;
    output.write_all(&body.into_inner())?;
    false.serialize(output)?;
    eof.serialize(output)?;
    Ok(())
}
