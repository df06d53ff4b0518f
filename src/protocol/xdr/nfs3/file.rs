//! Arguments and results of the NFSv3 data procedures: READ, WRITE, CREATE,
//! COMMIT and LINK (RFC 1813 sections 3.3.6 to 3.3.8, 3.3.15, 3.3.21).

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// READ (procedure 6) arguments, RFC 1813 section 3.3.6.
#[derive(Debug, Default)]
pub struct READ3args {
    pub file: nfs_fh3,
    /// Byte position to start reading at.
    pub offset: offset3,
    /// Bytes wanted; the reply may carry fewer.
    pub count: count3,
}
DeserializeStruct!(READ3args, file, offset, count);
SerializeStruct!(READ3args, file, offset, count);

#[derive(Debug, Default)]
pub struct READ3resok {
    pub file_attributes: post_op_attr,
    /// Bytes actually read.
    pub count: count3,
    /// The read reached the end of the file.
    pub eof: bool,
    pub data: Vec<u8>,
}
DeserializeStruct!(READ3resok, file_attributes, count, eof, data);
SerializeStruct!(READ3resok, file_attributes, count, eof, data);

/// How durable a WRITE must be before the server replies.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum stable_how {
    /// May stay in server memory until COMMIT.
    #[default]
    UNSTABLE = 0,
    /// Data, and the metadata needed to read it back, on stable storage.
    DATA_SYNC = 1,
    /// Data and all metadata on stable storage.
    FILE_SYNC = 2,
}
impl SerializeEnum for stable_how {}
impl DeserializeEnum for stable_how {}

/// WRITE (procedure 7) arguments, RFC 1813 section 3.3.7.
#[derive(Debug, Default)]
pub struct WRITE3args {
    pub file: nfs_fh3,
    pub offset: offset3,
    /// Must equal the length of `data`.
    pub count: count3,
    pub stable: stable_how,
    pub data: Vec<u8>,
}
DeserializeStruct!(WRITE3args, file, offset, count, stable, data);
SerializeStruct!(WRITE3args, file, offset, count, stable, data);

#[derive(Debug, Default)]
pub struct WRITE3resok {
    pub file_wcc: wcc_data,
    /// Bytes written.
    pub count: count3,
    /// Durability actually reached; never weaker than requested.
    pub committed: stable_how,
    /// Changes when the server restarts, telling clients to resend
    /// uncommitted data.
    pub verf: writeverf3,
}
DeserializeStruct!(WRITE3resok, file_wcc, count, committed, verf);
SerializeStruct!(WRITE3resok, file_wcc, count, committed, verf);

/// `createhow3`: the attributes or verifier accompanying a CREATE.
#[derive(Copy, Clone, Debug)]
pub enum createhow3 {
    UNCHECKED(sattr3),
    GUARDED(sattr3),
    EXCLUSIVE(createverf3),
}

impl Default for createhow3 {
    fn default() -> Self {
        createhow3::UNCHECKED(sattr3::default())
    }
}

impl Serialize for createhow3 {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            createhow3::UNCHECKED(attr) => {
                createmode3::UNCHECKED.serialize(dest)?;
                attr.serialize(dest)
            }
            createhow3::GUARDED(attr) => {
                createmode3::GUARDED.serialize(dest)?;
                attr.serialize(dest)
            }
            createhow3::EXCLUSIVE(verf) => {
                createmode3::EXCLUSIVE.serialize(dest)?;
                verf.serialize(dest)
            }
        }
    }
}

impl Deserialize for createhow3 {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<createmode3>(src)? {
            createmode3::UNCHECKED => createhow3::UNCHECKED(deserialize(src)?),
            createmode3::GUARDED => createhow3::GUARDED(deserialize(src)?),
            createmode3::EXCLUSIVE => createhow3::EXCLUSIVE(deserialize(src)?),
        };
        Ok(())
    }
}

/// CREATE (procedure 8) arguments, RFC 1813 section 3.3.8.
#[derive(Debug, Default)]
pub struct CREATE3args {
    /// Parent directory and the new name.
    pub dirops: diropargs3,
    pub how: createhow3,
}
DeserializeStruct!(CREATE3args, dirops, how);
SerializeStruct!(CREATE3args, dirops, how);

/// COMMIT (procedure 21) arguments, RFC 1813 section 3.3.21.
#[derive(Debug, Default)]
pub struct COMMIT3args {
    pub file: nfs_fh3,
    /// Start of the range to flush.
    pub offset: offset3,
    /// Length of the range; zero means to the end of the file.
    pub count: count3,
}
DeserializeStruct!(COMMIT3args, file, offset, count);
SerializeStruct!(COMMIT3args, file, offset, count);

#[derive(Debug, Default)]
pub struct COMMIT3resok {
    pub file_wcc: wcc_data,
    /// Compared by the client with the verifiers of its unstable writes.
    pub verf: writeverf3,
}
DeserializeStruct!(COMMIT3resok, file_wcc, verf);
SerializeStruct!(COMMIT3resok, file_wcc, verf);

/// LINK (procedure 15) arguments, RFC 1813 section 3.3.15.
#[derive(Debug, Default)]
pub struct LINK3args {
    /// Existing object to link to.
    pub file: nfs_fh3,
    /// Directory and name of the new link.
    pub link: diropargs3,
}
DeserializeStruct!(LINK3args, file, link);
SerializeStruct!(LINK3args, file, link);
