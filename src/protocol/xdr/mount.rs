//! MOUNT protocol data structures, versions 1 to 3 (RFC 1094 appendix A,
//! RFC 1813 appendix I).
//!
//! Versions 1 and 2 answer MNT with a fixed 32-byte handle; version 3 uses a
//! variable-length handle followed by the accepted auth flavors.

#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

pub const PROGRAM: u32 = 100005;
pub const VERSION_LOW: u32 = 1;
pub const VERSION_HIGH: u32 = 3;

/// Maximum bytes in a path name.
pub const MNTPATHLEN: u32 = 1024;
/// Maximum bytes in a name.
pub const MNTNAMLEN: u32 = 255;

/// Status codes of MNT (numerically shared by all three versions).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat3 {
    #[default]
    MNT3_OK = 0,
    MNT3ERR_PERM = 1,
    MNT3ERR_NOENT = 2,
    MNT3ERR_IO = 5,
    MNT3ERR_ACCES = 13,
    MNT3ERR_NOTDIR = 20,
    MNT3ERR_INVAL = 22,
    MNT3ERR_NAMETOOLONG = 63,
    MNT3ERR_NOTSUPP = 10004,
    MNT3ERR_SERVERFAULT = 10006,
}
impl SerializeEnum for mountstat3 {}
impl DeserializeEnum for mountstat3 {}

/// Version 3 MNT success body.
#[derive(Clone, Debug, Default)]
pub struct mountres3_ok {
    pub fhandle: Vec<u8>,
    pub auth_flavors: Vec<u32>,
}
DeserializeStruct!(mountres3_ok, fhandle, auth_flavors);
SerializeStruct!(mountres3_ok, fhandle, auth_flavors);

/// One `mountlist` node (DUMP): host name and mounted directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct mountbody {
    pub hostname: String,
    pub directory: String,
}
DeserializeStruct!(mountbody, hostname, directory);
SerializeStruct!(mountbody, hostname, directory);

#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum MountProgram {
    MOUNTPROC_NULL = 0,
    MOUNTPROC_MNT = 1,
    MOUNTPROC_DUMP = 2,
    MOUNTPROC_UMNT = 3,
    MOUNTPROC_UMNTALL = 4,
    MOUNTPROC_EXPORT = 5,
}
