//! ONC RPC v2 message structures (RFC 5531).
//!
//! The server side never decodes a whole `rpc_msg`: the dispatcher reads the
//! call header field by field and writes the reply header with
//! [`write_accepted_header`], keeping the offset of the accept status so it
//! can be back-patched. The full message types are kept for decoding replies
//! in tests and for the rejected-reply path.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// Highest (and only) RPC protocol version accepted.
pub const RPC_VERSION: u32 = 2;

/// `msg_type` discriminants.
pub const CALL: u32 = 0;
pub const REPLY: u32 = 1;

#[derive(Copy, Clone, Debug, Default, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_stat {
    #[default]
    AUTH_BADCRED = 1,
    AUTH_REJECTEDCRED = 2,
    AUTH_BADVERF = 3,
    AUTH_REJECTEDVERF = 4,
    AUTH_TOOWEAK = 5,
}
impl SerializeEnum for auth_stat {}
impl DeserializeEnum for auth_stat {}

/// Authentication flavors the gateway knows by name. Any other flavor is
/// carried as a raw number in [`opaque_auth::flavor`] and skipped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_flavor {
    AUTH_NULL = 0,
    AUTH_UNIX = 1,
    AUTH_SHORT = 2,
    AUTH_DES = 3,
}

/// AUTH_UNIX (AUTH_SYS) credential body.
#[derive(Clone, Debug, Default)]
pub struct auth_unix {
    pub stamp: u32,
    pub machinename: Vec<u8>,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}
DeserializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);
SerializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);

/// Credential or verifier: a flavor and up to 400 opaque bytes.
#[derive(Clone, Debug, Default)]
pub struct opaque_auth {
    pub flavor: u32,
    pub body: Vec<u8>,
}
DeserializeStruct!(opaque_auth, flavor, body);
SerializeStruct!(opaque_auth, flavor, body);

impl opaque_auth {
    /// Decodes the body as AUTH_UNIX credentials when the flavor says so.
    pub fn unix_credentials(&self) -> Option<auth_unix> {
        if self.flavor != auth_flavor::AUTH_UNIX as u32 {
            return None;
        }
        deserialize::<auth_unix>(&mut self.body.as_slice()).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct rpc_msg {
    pub xid: u32,
    pub body: rpc_body,
}
DeserializeStruct!(rpc_msg, xid, body);
SerializeStruct!(rpc_msg, xid, body);

#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
pub enum rpc_body {
    CALL(call_body),
    REPLY(reply_body),
}

impl Default for rpc_body {
    fn default() -> rpc_body {
        rpc_body::CALL(call_body::default())
    }
}

impl Serialize for rpc_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rpc_body::CALL(v) => {
                CALL.serialize(dest)?;
                v.serialize(dest)
            }
            rpc_body::REPLY(v) => {
                REPLY.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rpc_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            CALL => *self = rpc_body::CALL(deserialize(src)?),
            REPLY => *self = rpc_body::REPLY(deserialize(src)?),
            msg_type => {
                return Err(invalid_data(&format!("Invalid message type in rpc_body: {msg_type}")))
            }
        }
        Ok(())
    }
}

/// Call header fields after the message type.
#[derive(Clone, Debug, Default)]
pub struct call_body {
    pub rpcvers: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: opaque_auth,
    pub verf: opaque_auth,
}
DeserializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);
SerializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);

#[derive(Clone, Debug)]
pub enum reply_body {
    MSG_ACCEPTED(accepted_reply),
    MSG_DENIED(rejected_reply),
}

impl Default for reply_body {
    fn default() -> reply_body {
        reply_body::MSG_ACCEPTED(accepted_reply::default())
    }
}

impl Serialize for reply_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            reply_body::MSG_ACCEPTED(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            reply_body::MSG_DENIED(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for reply_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = reply_body::MSG_ACCEPTED(deserialize(src)?),
            1 => *self = reply_body::MSG_DENIED(deserialize(src)?),
            reply_status => {
                return Err(invalid_data(&format!("Invalid reply status: {reply_status}")))
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct mismatch_info {
    pub low: u32,
    pub high: u32,
}
DeserializeStruct!(mismatch_info, low, high);
SerializeStruct!(mismatch_info, low, high);

#[derive(Clone, Debug, Default)]
pub struct accepted_reply {
    pub verf: opaque_auth,
    pub reply_data: accept_body,
}
DeserializeStruct!(accepted_reply, verf, reply_data);
SerializeStruct!(accepted_reply, verf, reply_data);

/// `accept_stat` values as they appear on the wire.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum accept_stat {
    #[default]
    SUCCESS = 0,
    PROG_UNAVAIL = 1,
    PROG_MISMATCH = 2,
    PROC_UNAVAIL = 3,
    GARBAGE_ARGS = 4,
    SYSTEM_ERR = 5,
}
impl SerializeEnum for accept_stat {}
impl DeserializeEnum for accept_stat {}

/// Accepted reply data, discriminated by `accept_stat`.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum accept_body {
    #[default]
    SUCCESS,
    PROG_UNAVAIL,
    PROG_MISMATCH(mismatch_info),
    PROC_UNAVAIL,
    GARBAGE_ARGS,
    SYSTEM_ERR,
}

impl Serialize for accept_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            accept_body::SUCCESS => accept_stat::SUCCESS.serialize(dest),
            accept_body::PROG_UNAVAIL => accept_stat::PROG_UNAVAIL.serialize(dest),
            accept_body::PROG_MISMATCH(v) => {
                accept_stat::PROG_MISMATCH.serialize(dest)?;
                v.serialize(dest)
            }
            accept_body::PROC_UNAVAIL => accept_stat::PROC_UNAVAIL.serialize(dest),
            accept_body::GARBAGE_ARGS => accept_stat::GARBAGE_ARGS.serialize(dest),
            accept_body::SYSTEM_ERR => accept_stat::SYSTEM_ERR.serialize(dest),
        }
    }
}

impl Deserialize for accept_body {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        *self = match deserialize::<accept_stat>(src)? {
            accept_stat::SUCCESS => accept_body::SUCCESS,
            accept_stat::PROG_UNAVAIL => accept_body::PROG_UNAVAIL,
            accept_stat::PROG_MISMATCH => accept_body::PROG_MISMATCH(deserialize(src)?),
            accept_stat::PROC_UNAVAIL => accept_body::PROC_UNAVAIL,
            accept_stat::GARBAGE_ARGS => accept_body::GARBAGE_ARGS,
            accept_stat::SYSTEM_ERR => accept_body::SYSTEM_ERR,
        };
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub enum rejected_reply {
    RPC_MISMATCH(mismatch_info),
    AUTH_ERROR(auth_stat),
}

impl Default for rejected_reply {
    fn default() -> rejected_reply {
        rejected_reply::AUTH_ERROR(auth_stat::default())
    }
}

impl Serialize for rejected_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rejected_reply::RPC_MISMATCH(v) => {
                0_u32.serialize(dest)?;
                v.serialize(dest)
            }
            rejected_reply::AUTH_ERROR(v) => {
                1_u32.serialize(dest)?;
                v.serialize(dest)
            }
        }
    }
}

impl Deserialize for rejected_reply {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = rejected_reply::RPC_MISMATCH(deserialize(src)?),
            1 => *self = rejected_reply::AUTH_ERROR(deserialize(src)?),
            reject_stat => {
                return Err(invalid_data(&format!("Invalid reject stat: {reject_stat}")))
            }
        }
        Ok(())
    }
}

/// Writes `xid, REPLY, MSG_ACCEPTED, AUTH_NULL verifier, SUCCESS`.
///
/// Returns the offset of the accept status so the caller can patch it.
pub fn write_accepted_header(xid: u32, dest: &mut XdrBuffer) -> std::io::Result<usize> {
    xid.serialize(dest)?;
    REPLY.serialize(dest)?;
    0_u32.serialize(dest)?;
    opaque_auth::default().serialize(dest)?;
    let stat_pos = dest.position();
    accept_stat::SUCCESS.serialize(dest)?;
    Ok(stat_pos)
}

/// A complete `MSG_DENIED / RPC_MISMATCH` reply.
pub fn rpc_vers_mismatch(xid: u32) -> rpc_msg {
    let reply = reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(mismatch_info {
        low: RPC_VERSION,
        high: RPC_VERSION,
    }));
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}
