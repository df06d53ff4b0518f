//! BOOTPARAM protocol, version 1.
//!
//! A diskless client broadcasts WHOAMI with its address to learn its host
//! and domain name, then asks GETFILE where its root file system lives. The
//! gateway serves exactly one client, so both answers come straight from
//! [`BootParams`].

use std::io::{Cursor, Read, Write};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

use num_traits::cast::FromPrimitive;

use crate::protocol::rpc::{self, ProcError, ProcResult, RpcProgram};
use crate::protocol::xdr::bootparam::{self, BootparamProgram};
use crate::protocol::xdr::XdrBuffer;

mod getfile;
mod null;
mod whoami;

use getfile::bootparamproc_getfile;
use null::bootparamproc_null;
use whoami::bootparamproc_whoami;

/// Key of the root file system in GETFILE.
pub const ROOT_FILE_ID: &str = "root";

/// Answers given to the boot client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootParams {
    pub client_name: String,
    pub domain_name: String,
    pub server_name: String,
    pub server_address: Ipv4Addr,
    /// Path the client mounts as `/`; normally the export name.
    pub root_path: String,
}

impl Default for BootParams {
    fn default() -> Self {
        BootParams {
            client_name: "guest".to_string(),
            domain_name: String::new(),
            server_name: "gateway".to_string(),
            server_address: Ipv4Addr::new(10, 0, 2, 2),
            root_path: "/export".to_string(),
        }
    }
}

impl BootParams {
    /// Server path for a GETFILE key. Only the root is known; other keys
    /// (swap, dump) get an empty path.
    pub fn file_path(&self, file_id: &str) -> &str {
        if file_id == ROOT_FILE_ID {
            &self.root_path
        } else {
            ""
        }
    }
}

/// The BOOTPARAM program.
#[derive(Debug, Default)]
pub struct BootparamService;

impl RpcProgram for BootparamService {
    fn program(&self) -> u32 {
        bootparam::PROGRAM
    }

    fn name(&self) -> &'static str {
        "bootparam"
    }

    fn versions(&self) -> RangeInclusive<u32> {
        bootparam::VERSION..=bootparam::VERSION
    }

    fn call(
        &self,
        proc: u32,
        input: &mut Cursor<&[u8]>,
        output: &mut XdrBuffer,
        context: &mut rpc::Context<'_>,
    ) -> ProcResult {
        handle_bootparam(proc, input, output, context)
    }
}

pub fn handle_bootparam(
    proc: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let xid = context.xid;
    let Some(prog) = BootparamProgram::from_u32(proc) else {
        return Err(ProcError::NotImplemented);
    };

    match prog {
        BootparamProgram::BOOTPARAMPROC_NULL => bootparamproc_null(xid, input, output),
        BootparamProgram::BOOTPARAMPROC_WHOAMI => {
            bootparamproc_whoami(xid, input, output, context)
        }
        BootparamProgram::BOOTPARAMPROC_GETFILE => {
            bootparamproc_getfile(xid, input, output, context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_root_has_a_path() {
        let params = BootParams { root_path: "/export/netbsd".to_string(), ..Default::default() };
        assert_eq!(params.file_path("root"), "/export/netbsd");
        assert_eq!(params.file_path("swap"), "");
    }
}
