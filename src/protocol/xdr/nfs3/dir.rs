//! Arguments and entries of the NFSv3 namespace procedures: MKDIR, SYMLINK,
//! MKNOD, RENAME, READDIR and READDIRPLUS.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use super::*;

/// MKDIR (procedure 9) arguments, RFC 1813 section 3.3.9.
#[derive(Debug, Default)]
pub struct MKDIR3args {
    /// Parent directory and the new name.
    pub dirops: diropargs3,
    /// Initial attributes; unset fields take server defaults.
    pub attributes: sattr3,
}
DeserializeStruct!(MKDIR3args, dirops, attributes);
SerializeStruct!(MKDIR3args, dirops, attributes);

/// SYMLINK (procedure 10) arguments, RFC 1813 section 3.3.10.
#[derive(Debug, Default)]
pub struct SYMLINK3args {
    /// Parent directory and the link name.
    pub dirops: diropargs3,
    /// Link attributes and the target, stored as given.
    pub symlink: symlinkdata3,
}
DeserializeStruct!(SYMLINK3args, dirops, symlink);
SerializeStruct!(SYMLINK3args, dirops, symlink);

/// RENAME (procedure 14) arguments, RFC 1813 section 3.3.14.
#[derive(Debug, Default)]
pub struct RENAME3args {
    /// Source directory and name.
    pub from: diropargs3,
    /// Target directory and name; an existing target is replaced.
    pub to: diropargs3,
}
DeserializeStruct!(RENAME3args, from, to);
SerializeStruct!(RENAME3args, from, to);

/// One READDIR entry, RFC 1813 section 3.3.16.
#[derive(Debug, Default)]
pub struct entry3 {
    /// Same value as the `fileid` attribute of the object.
    pub fileid: fileid3,
    pub name: filename3,
    /// Position to resume from after this entry.
    pub cookie: cookie3,
}
DeserializeStruct!(entry3, fileid, name, cookie);
SerializeStruct!(entry3, fileid, name, cookie);

/// READDIR (procedure 16) arguments, RFC 1813 section 3.3.16.
#[derive(Debug, Default)]
pub struct READDIR3args {
    pub dir: nfs_fh3,
    /// Zero starts at the beginning of the listing.
    pub cookie: cookie3,
    /// Echo of the verifier from the previous reply.
    pub cookieverf: cookieverf3,
    /// Byte limit for the whole reply.
    pub dircount: count3,
}
DeserializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);
SerializeStruct!(READDIR3args, dir, cookie, cookieverf, dircount);

/// One READDIRPLUS entry, RFC 1813 section 3.3.17.
#[derive(Debug, Default)]
pub struct entryplus3 {
    pub fileid: fileid3,
    pub name: filename3,
    /// Position to resume from after this entry.
    pub cookie: cookie3,
    /// Attributes of the named object, when available.
    pub name_attributes: post_op_attr,
    /// Handle of the named object, saving the client a LOOKUP.
    pub name_handle: post_op_fh3,
}
DeserializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);
SerializeStruct!(entryplus3, fileid, name, cookie, name_attributes, name_handle);

/// READDIRPLUS (procedure 17) arguments, RFC 1813 section 3.3.17.
#[derive(Debug, Default)]
pub struct READDIRPLUS3args {
    pub dir: nfs_fh3,
    pub cookie: cookie3,
    pub cookieverf: cookieverf3,
    /// Byte limit for names and cookies alone.
    pub dircount: count3,
    /// Byte limit for the whole reply, attributes and handles included.
    pub maxcount: count3,
}
DeserializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
SerializeStruct!(READDIRPLUS3args, dir, cookie, cookieverf, dircount, maxcount);
