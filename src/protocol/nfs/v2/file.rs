//! READ (procedure 6), WRITE (procedure 8) and CREATE (procedure 9),
//! RFC 1094 sections 2.2.7, 2.2.9 and 2.2.10.
//!
//! Version 2 writes are always synchronous. CREATE also makes the special
//! files the host cannot: when the requested mode carries the format bits of
//! a character or block device, a FIFO or a socket, an empty regular file is
//! created and the format bits are recorded in the shadow store. For devices
//! the `size` word of the `sattr` carries the device number.

use std::io::{Read, Write};

use tracing::{debug, error};

use super::{reply_attrstat, reply_diropres};
use crate::filetable::FileHandle;
use crate::fs_util::{SetAttrs, S_IFBLK, S_IFCHR, S_IFIFO, S_IFMT, S_IFSOCK};
use crate::protocol::rpc::{self, ProcResult};
use crate::protocol::xdr::nfs3::file::stable_how;
use crate::protocol::xdr::{deserialize, nfs2, Serialize};
use crate::vfs::{CreateMode, SpecialNode};

pub fn nfsproc2_read(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::readargs>(input)?;
    debug!("nfsproc2_read({:?},{:?}) ", xid, args);

    let handle = FileHandle::from_v2(&args.file);
    let count = args.count.min(nfs2::MAXDATA);
    match context.state.vfs.read(&handle, u64::from(args.offset), count) {
        Ok(read) => {
            debug!(" {:?} --> read {} bytes", xid, read.data.len());
            nfs2::nfsstat::NFS_OK.serialize(output)?;
            nfs2::fattr::from(&read.attrs).serialize(output)?;
            read.data.serialize(output)?;
        }
        Err(stat) => {
            error!("nfsproc2_read error {:?} --> {:?}", xid, stat);
            nfs2::nfsstat::from(stat).serialize(output)?;
        }
    }
    Ok(())
}

pub fn nfsproc2_write(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::writeargs>(input)?;
    debug!(
        "nfsproc2_write({:?},{:?},offset {},count {}) ",
        xid,
        args.file,
        args.offset,
        args.data.len()
    );

    let handle = FileHandle::from_v2(&args.file);
    let result = context
        .state
        .vfs
        .write(&handle, u64::from(args.offset), &args.data, stable_how::FILE_SYNC)
        .map(|written| written.attrs)
        .map_err(nfs2::nfsstat::from);
    if let Err(stat) = result {
        error!("nfsproc2_write error {:?} --> {:?}", xid, stat);
    }
    reply_attrstat(result, output)?;
    Ok(())
}

/// Special file described by the format bits of a requested mode.
fn special_node(attrs: &mut SetAttrs) -> Option<SpecialNode> {
    let format = attrs.mode? & S_IFMT;
    match format {
        S_IFCHR | S_IFBLK => {
            let rdev = attrs.size.take().unwrap_or(0) as u32;
            Some(SpecialNode { format, rdev })
        }
        S_IFIFO | S_IFSOCK => {
            attrs.size = None;
            Some(SpecialNode { format, rdev: 0 })
        }
        _ => None,
    }
}

pub fn nfsproc2_create(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let args = deserialize::<nfs2::createargs>(input)?;
    debug!("nfsproc2_create({:?},{:?}) ", xid, args);

    let dir = FileHandle::from_v2(&args.dirops.dir);
    let mut attrs = SetAttrs::from(&args.attributes);
    let special = special_node(&mut attrs);
    if let Some(node) = special {
        debug!("create special node {:o} rdev {:x}", node.format, node.rdev);
    }
    let owner = context.owner();
    let result = match context.state.vfs.create(
        &dir,
        &args.dirops.name,
        CreateMode::Unchecked,
        &attrs,
        special,
        owner,
    ) {
        Ok((fh, attrs, _)) => {
            debug!("create success {:?} --> {:x}", xid, fh.id());
            Ok(nfs2::diropokres { file: fh.to_v2(), attributes: nfs2::fattr::from(&attrs) })
        }
        Err(stat) => {
            error!("nfsproc2_create error {:?} --> {:?}", xid, stat);
            Err(nfs2::nfsstat::from(stat))
        }
    };
    reply_diropres(result, output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_number_comes_from_size() {
        let mut attrs = SetAttrs {
            mode: Some(S_IFCHR | 0o620),
            size: Some(0x0c03),
            ..SetAttrs::default()
        };
        let node = special_node(&mut attrs).expect("device");
        assert_eq!(node, SpecialNode { format: S_IFCHR, rdev: 0x0c03 });
        assert_eq!(attrs.size, None);
    }

    #[test]
    fn regular_modes_are_not_special() {
        let mut attrs = SetAttrs { mode: Some(0o100644), size: Some(0), ..SetAttrs::default() };
        assert_eq!(special_node(&mut attrs), None);
        assert_eq!(attrs.size, Some(0));
        assert_eq!(special_node(&mut SetAttrs::default()), None);
    }
}
