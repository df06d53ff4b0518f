//! GETATTR (procedure 1) and SETATTR (procedure 2), RFC 1094 sections 2.2.2
//! and 2.2.3.
//!
//! Both reply with an `attrstat`. SETATTR takes a `sattr` in which any word
//! of `0xFFFFFFFF` means "leave unchanged"; a `useconds` of one million asks
//! for the server's clock.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::reply_attrstat;
use crate::filetable::FileHandle;
use crate::fs_util::SetAttrs;
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::{deserialize, nfs2};

pub fn nfsproc2_getattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let handle = deserialize::<nfs2::fhandle>(input)?;
    let handle = FileHandle::from_v2(&handle);
    debug!("nfsproc2_getattr({:?},{:x}) ", xid, handle.id());

    let result = context.state.vfs.getattr(&handle).map_err(nfs2::nfsstat::from);
    if let Err(stat) = result {
        error!("nfsproc2_getattr error {:?} --> {:?}", xid, stat);
    }
    reply_attrstat(result, output)?;
    Ok(())
}

pub fn nfsproc2_setattr(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::sattrargs>(input)?;
    debug!("nfsproc2_setattr({:?},{:?}) ", xid, args);

    let handle = FileHandle::from_v2(&args.file);
    let attrs = SetAttrs::from(&args.attributes);
    let result = context
        .state
        .vfs
        .setattr(&handle, &attrs, None)
        .and_then(|wcc| match wcc.after {
            Some(after) => Ok(after),
            None => context.state.vfs.getattr(&handle),
        })
        .map_err(nfs2::nfsstat::from);
    if let Err(stat) = result {
        error!("nfsproc2_setattr error {:?} --> {:?}", xid, stat);
    }
    reply_attrstat(result, output)?;
    Ok(())
}
