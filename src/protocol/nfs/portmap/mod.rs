//! PORTMAP protocol, version 2, as specified in RFC 1057 A.1 and A.2 sections.
//! https://datatracker.ietf.org/doc/rfc1057/
//!
//! The table is static: it is filled at startup from the registered programs
//! and the configured ports, and PMAPPROC_SET, PMAPPROC_UNSET and
//! PMAPPROC_CALLIT answer `PROC_UNAVAIL`.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::ops::RangeInclusive;

use num_traits::cast::FromPrimitive;

use crate::protocol::rpc::{self, ProcError, ProcResult, RpcProgram, ServerRegistry};
use crate::protocol::xdr::portmap::{self, mapping, PortmapProgram, IPPROTO_TCP, IPPROTO_UDP};
use crate::protocol::xdr::XdrBuffer;

mod dump;
mod get_port;
mod null;

use dump::pmapproc_dump;
use get_port::pmapproc_getport;
use null::pmapproc_null;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortmapKey {
    pub prog: u32,
    pub vers: u32,
    pub prot: u32,
}

/// Program/version/protocol to port table, ordered by key.
#[derive(Clone, Debug, Default)]
pub struct PortmapTable {
    table: BTreeMap<PortmapKey, u16>,
}

impl PortmapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// One TCP and one UDP entry per version of every registered program.
    /// The portmapper itself is listed on `portmap_port`, everything else on
    /// `service_port`.
    pub fn from_registry(registry: &ServerRegistry, service_port: u16, portmap_port: u16) -> Self {
        let mut table = Self::new();
        for program in registry.programs() {
            let number = program.program();
            let port = if number == portmap::PROGRAM { portmap_port } else { service_port };
            for vers in program.versions() {
                table.insert(number, vers, IPPROTO_TCP, port);
                table.insert(number, vers, IPPROTO_UDP, port);
            }
        }
        table
    }

    pub fn insert(&mut self, prog: u32, vers: u32, prot: u32, port: u16) {
        self.table.insert(PortmapKey { prog, vers, prot }, port);
    }

    /// Port for the triple, or 0 if nothing is registered.
    pub fn port(&self, prog: u32, vers: u32, prot: u32) -> u16 {
        self.table.get(&PortmapKey { prog, vers, prot }).copied().unwrap_or(0)
    }

    pub fn mappings(&self) -> impl Iterator<Item = mapping> + '_ {
        self.table.iter().map(|(key, port)| mapping {
            prog: key.prog,
            vers: key.vers,
            prot: key.prot,
            port: u32::from(*port),
        })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// The PORTMAP program.
#[derive(Debug, Default)]
pub struct PortmapService;

impl RpcProgram for PortmapService {
    fn program(&self) -> u32 {
        portmap::PROGRAM
    }

    fn name(&self) -> &'static str {
        "portmap"
    }

    fn versions(&self) -> RangeInclusive<u32> {
        portmap::VERSION..=portmap::VERSION
    }

    fn call(
        &self,
        proc: u32,
        input: &mut Cursor<&[u8]>,
        output: &mut XdrBuffer,
        context: &mut rpc::Context<'_>,
    ) -> ProcResult {
        handle_portmap(proc, input, output, context)
    }
}

/// Main handler for PORTMAP protocol
///
/// # Arguments
///
/// * `proc` - Procedure number from the call header
/// * `input` - Input stream for reading procedure arguments
/// * `output` - Output stream for writing procedure results
/// * `context` - Call context holding the portmap table
pub fn handle_portmap(
    proc: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let xid = context.xid;
    match PortmapProgram::from_u32(proc) {
        Some(PortmapProgram::PMAPPROC_NULL) => pmapproc_null(xid, input, output),
        Some(PortmapProgram::PMAPPROC_GETPORT) => pmapproc_getport(xid, input, output, context),
        Some(PortmapProgram::PMAPPROC_DUMP) => pmapproc_dump(xid, output, context),
        _ => Err(ProcError::NotImplemented),
    }
}
