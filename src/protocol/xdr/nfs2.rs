//! NFS version 2 wire types (RFC 1094 section 2.3).
//!
//! Version 2 predates 64-bit sizes: every attribute is a 32-bit word, and a
//! settable attribute of `0xFFFFFFFF` (or a time with `seconds == -1`) means
//! "leave unchanged".

#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::nfs3::{nfsstat3, nfsstring};
use super::*;

pub const PROGRAM: u32 = 100003;
pub const VERSION: u32 = 2;

/// Size in bytes of a version 2 file handle.
pub const FHSIZE: usize = 32;
/// Largest READ or WRITE payload.
pub const MAXDATA: u32 = 8192;
pub const MAXPATHLEN: u32 = 1024;
pub const MAXNAMLEN: u32 = 255;

/// "Leave unchanged" marker in `sattr`.
pub const SATTR_UNSET: u32 = 0xFFFF_FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    NFSPROC_NULL = 0,
    NFSPROC_GETATTR = 1,
    NFSPROC_SETATTR = 2,
    NFSPROC_ROOT = 3,
    NFSPROC_LOOKUP = 4,
    NFSPROC_READLINK = 5,
    NFSPROC_READ = 6,
    NFSPROC_WRITECACHE = 7,
    NFSPROC_WRITE = 8,
    NFSPROC_CREATE = 9,
    NFSPROC_REMOVE = 10,
    NFSPROC_RENAME = 11,
    NFSPROC_LINK = 12,
    NFSPROC_SYMLINK = 13,
    NFSPROC_MKDIR = 14,
    NFSPROC_RMDIR = 15,
    NFSPROC_READDIR = 16,
    NFSPROC_STATFS = 17,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat {
    #[default]
    NFS_OK = 0,
    NFSERR_PERM = 1,
    NFSERR_NOENT = 2,
    NFSERR_IO = 5,
    NFSERR_NXIO = 6,
    NFSERR_ACCES = 13,
    NFSERR_EXIST = 17,
    NFSERR_NODEV = 19,
    NFSERR_NOTDIR = 20,
    NFSERR_ISDIR = 21,
    NFSERR_FBIG = 27,
    NFSERR_NOSPC = 28,
    NFSERR_ROFS = 30,
    NFSERR_NAMETOOLONG = 63,
    NFSERR_NOTEMPTY = 66,
    NFSERR_DQUOT = 69,
    NFSERR_STALE = 70,
    NFSERR_WFLUSH = 99,
}
impl SerializeEnum for nfsstat {}
impl DeserializeEnum for nfsstat {}

impl From<nfsstat3> for nfsstat {
    fn from(stat: nfsstat3) -> Self {
        match stat {
            nfsstat3::NFS3_OK => nfsstat::NFS_OK,
            nfsstat3::NFS3ERR_PERM => nfsstat::NFSERR_PERM,
            nfsstat3::NFS3ERR_NOENT => nfsstat::NFSERR_NOENT,
            nfsstat3::NFS3ERR_NXIO => nfsstat::NFSERR_NXIO,
            nfsstat3::NFS3ERR_ACCES => nfsstat::NFSERR_ACCES,
            nfsstat3::NFS3ERR_EXIST => nfsstat::NFSERR_EXIST,
            nfsstat3::NFS3ERR_NODEV => nfsstat::NFSERR_NODEV,
            nfsstat3::NFS3ERR_NOTDIR => nfsstat::NFSERR_NOTDIR,
            nfsstat3::NFS3ERR_ISDIR => nfsstat::NFSERR_ISDIR,
            nfsstat3::NFS3ERR_FBIG => nfsstat::NFSERR_FBIG,
            nfsstat3::NFS3ERR_NOSPC => nfsstat::NFSERR_NOSPC,
            nfsstat3::NFS3ERR_ROFS => nfsstat::NFSERR_ROFS,
            nfsstat3::NFS3ERR_NAMETOOLONG => nfsstat::NFSERR_NAMETOOLONG,
            nfsstat3::NFS3ERR_NOTEMPTY => nfsstat::NFSERR_NOTEMPTY,
            nfsstat3::NFS3ERR_DQUOT => nfsstat::NFSERR_DQUOT,
            nfsstat3::NFS3ERR_STALE | nfsstat3::NFS3ERR_BADHANDLE => nfsstat::NFSERR_STALE,
            _ => nfsstat::NFSERR_IO,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype {
    #[default]
    NFNON = 0,
    NFREG = 1,
    NFDIR = 2,
    NFBLK = 3,
    NFCHR = 4,
    NFLNK = 5,
    NFSOCK = 6,
    NFBAD = 7,
    NFFIFO = 8,
}
impl SerializeEnum for ftype {}
impl DeserializeEnum for ftype {}

/// Fixed-size opaque file handle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fhandle(pub [u8; FHSIZE]);

impl Serialize for fhandle {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for fhandle {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct timeval {
    pub seconds: u32,
    pub useconds: u32,
}
DeserializeStruct!(timeval, seconds, useconds);
SerializeStruct!(timeval, seconds, useconds);

impl timeval {
    pub fn is_unset(&self) -> bool {
        self.seconds == SATTR_UNSET
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr {
    pub ftype: ftype,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub blocksize: u32,
    pub rdev: u32,
    pub blocks: u32,
    pub fsid: u32,
    pub fileid: u32,
    pub atime: timeval,
    pub mtime: timeval,
    pub ctime: timeval,
}
DeserializeStruct!(
    fattr, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);
SerializeStruct!(
    fattr, ftype, mode, nlink, uid, gid, size, blocksize, rdev, blocks, fsid, fileid, atime,
    mtime, ctime
);

/// Settable attributes; any word equal to [`SATTR_UNSET`] is ignored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct sattr {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: timeval,
    pub mtime: timeval,
}
DeserializeStruct!(sattr, mode, uid, gid, size, atime, mtime);
SerializeStruct!(sattr, mode, uid, gid, size, atime, mtime);

impl Default for sattr {
    fn default() -> Self {
        let unset_time = timeval { seconds: SATTR_UNSET, useconds: SATTR_UNSET };
        sattr {
            mode: SATTR_UNSET,
            uid: SATTR_UNSET,
            gid: SATTR_UNSET,
            size: SATTR_UNSET,
            atime: unset_time,
            mtime: unset_time,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct diropargs {
    pub dir: fhandle,
    pub name: nfsstring,
}
DeserializeStruct!(diropargs, dir, name);
SerializeStruct!(diropargs, dir, name);

#[derive(Clone, Debug, Default)]
pub struct diropokres {
    pub file: fhandle,
    pub attributes: fattr,
}
DeserializeStruct!(diropokres, file, attributes);
SerializeStruct!(diropokres, file, attributes);

#[derive(Clone, Debug, Default)]
pub struct sattrargs {
    pub file: fhandle,
    pub attributes: sattr,
}
DeserializeStruct!(sattrargs, file, attributes);
SerializeStruct!(sattrargs, file, attributes);

#[derive(Clone, Debug, Default)]
pub struct readargs {
    pub file: fhandle,
    pub offset: u32,
    pub count: u32,
    pub totalcount: u32,
}
DeserializeStruct!(readargs, file, offset, count, totalcount);
SerializeStruct!(readargs, file, offset, count, totalcount);

#[derive(Clone, Debug, Default)]
pub struct writeargs {
    pub file: fhandle,
    pub beginoffset: u32,
    pub offset: u32,
    pub totalcount: u32,
    pub data: Vec<u8>,
}
DeserializeStruct!(writeargs, file, beginoffset, offset, totalcount, data);
SerializeStruct!(writeargs, file, beginoffset, offset, totalcount, data);

#[derive(Clone, Debug, Default)]
pub struct createargs {
    pub dirops: diropargs,
    pub attributes: sattr,
}
DeserializeStruct!(createargs, dirops, attributes);
SerializeStruct!(createargs, dirops, attributes);

#[derive(Clone, Debug, Default)]
pub struct renameargs {
    pub from: diropargs,
    pub to: diropargs,
}
DeserializeStruct!(renameargs, from, to);
SerializeStruct!(renameargs, from, to);

#[derive(Clone, Debug, Default)]
pub struct linkargs {
    pub from: fhandle,
    pub to: diropargs,
}
DeserializeStruct!(linkargs, from, to);
SerializeStruct!(linkargs, from, to);

#[derive(Clone, Debug, Default)]
pub struct symlinkargs {
    pub from: diropargs,
    pub to: nfsstring,
    pub attributes: sattr,
}
DeserializeStruct!(symlinkargs, from, to, attributes);
SerializeStruct!(symlinkargs, from, to, attributes);

/// READDIR cookies are 4 opaque bytes; this server stores a big-endian
/// ordinal in them.
pub type nfscookie = [u8; 4];

#[derive(Clone, Debug, Default)]
pub struct readdirargs {
    pub dir: fhandle,
    pub cookie: nfscookie,
    pub count: u32,
}
DeserializeStruct!(readdirargs, dir, cookie, count);
SerializeStruct!(readdirargs, dir, cookie, count);

#[derive(Clone, Debug, Default)]
pub struct entry {
    pub fileid: u32,
    pub name: nfsstring,
    pub cookie: nfscookie,
}
DeserializeStruct!(entry, fileid, name, cookie);
SerializeStruct!(entry, fileid, name, cookie);

#[derive(Clone, Debug, Default)]
pub struct statfsokres {
    pub tsize: u32,
    pub bsize: u32,
    pub blocks: u32,
    pub bfree: u32,
    pub bavail: u32,
}
DeserializeStruct!(statfsokres, tsize, bsize, blocks, bfree, bavail);
SerializeStruct!(statfsokres, tsize, bsize, blocks, bfree, bavail);
