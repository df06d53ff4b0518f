//! Bootparam protocol (program 100026, version 1) data structures, as used by
//! diskless clients to learn their host name and root export.

#![allow(non_camel_case_types)]
#![allow(clippy::upper_case_acronyms)]

use std::io::{Read, Write};
use std::net::Ipv4Addr;

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

pub const PROGRAM: u32 = 100026;
pub const VERSION: u32 = 1;

/// The only address family bootparam defines.
pub const IP_ADDR_TYPE: u32 = 1;

/// `bp_address`: an IPv4 address whose four octets are each sent as an XDR
/// `char` (one full 4-byte word apiece).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct bp_address(pub Ipv4Addr);

impl Default for bp_address {
    fn default() -> Self {
        bp_address(Ipv4Addr::UNSPECIFIED)
    }
}

impl Serialize for bp_address {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        IP_ADDR_TYPE.serialize(dest)?;
        for octet in self.0.octets() {
            u32::from(octet).serialize(dest)?;
        }
        Ok(())
    }
}

impl Deserialize for bp_address {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        let kind = deserialize::<u32>(src)?;
        if kind != IP_ADDR_TYPE {
            return Err(invalid_data(&format!("unsupported bootparam address type {kind}")));
        }
        let mut octets = [0u8; 4];
        for octet in octets.iter_mut() {
            *octet = (deserialize::<u32>(src)? & 0xff) as u8;
        }
        self.0 = Ipv4Addr::from(octets);
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct bp_whoami_arg {
    pub client_address: bp_address,
}
DeserializeStruct!(bp_whoami_arg, client_address);
SerializeStruct!(bp_whoami_arg, client_address);

#[derive(Clone, Debug, Default)]
pub struct bp_whoami_res {
    pub client_name: String,
    pub domain_name: String,
    pub router_address: bp_address,
}
DeserializeStruct!(bp_whoami_res, client_name, domain_name, router_address);
SerializeStruct!(bp_whoami_res, client_name, domain_name, router_address);

#[derive(Clone, Debug, Default)]
pub struct bp_getfile_arg {
    pub client_name: String,
    pub file_id: String,
}
DeserializeStruct!(bp_getfile_arg, client_name, file_id);
SerializeStruct!(bp_getfile_arg, client_name, file_id);

#[derive(Clone, Debug, Default)]
pub struct bp_getfile_res {
    pub server_name: String,
    pub server_address: bp_address,
    pub server_path: String,
}
DeserializeStruct!(bp_getfile_res, server_name, server_address, server_path);
SerializeStruct!(bp_getfile_res, server_name, server_address, server_path);

#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum BootparamProgram {
    BOOTPARAMPROC_NULL = 0,
    BOOTPARAMPROC_WHOAMI = 1,
    BOOTPARAMPROC_GETFILE = 2,
}
