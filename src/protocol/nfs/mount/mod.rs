//! MOUNT protocol, versions 1 to 3, as specified in RFC 1094 appendix A and
//! RFC 1813 section 5.0.
//! https://datatracker.ietf.org/doc/html/rfc1813#section-5.0
//!
//! The gateway has exactly one export. MNT hands out the handle of the
//! export root or of a directory below it and records the client in the
//! [`MountList`]; DUMP, UMNT and UMNTALL read and prune that list.

use std::io::{Cursor, Read, Write};
use std::ops::RangeInclusive;

use num_traits::cast::FromPrimitive;

use crate::protocol::rpc::{self, ProcError, ProcResult, RpcProgram};
use crate::protocol::xdr::mount::{self, MountProgram};
use crate::protocol::xdr::XdrBuffer;

mod dump;
mod export;
mod mnt;
mod null;
mod umnt;
mod umnt_all;

use dump::mountproc_dump;
use export::mountproc_export;
use mnt::mountproc_mnt;
use null::mountproc_null;
use umnt::mountproc_umnt;
use umnt_all::mountproc_umnt_all;

/// Clients that have mounted the export, in mount order.
#[derive(Clone, Debug, Default)]
pub struct MountList {
    entries: Vec<mount::mountbody>,
}

impl MountList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mount; mounting the same directory twice is one entry.
    pub fn add(&mut self, hostname: &str, directory: &str) {
        let entry =
            mount::mountbody { hostname: hostname.to_string(), directory: directory.to_string() };
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Returns true if the entry was present.
    pub fn remove(&mut self, hostname: &str, directory: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.hostname != hostname || e.directory != directory);
        self.entries.len() != before
    }

    /// Drops every entry of `hostname`; returns how many there were.
    pub fn remove_host(&mut self, hostname: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.hostname != hostname);
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[mount::mountbody] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The MOUNT program.
#[derive(Debug, Default)]
pub struct MountService;

impl RpcProgram for MountService {
    fn program(&self) -> u32 {
        mount::PROGRAM
    }

    fn name(&self) -> &'static str {
        "mount"
    }

    fn versions(&self) -> RangeInclusive<u32> {
        mount::VERSION_LOW..=mount::VERSION_HIGH
    }

    fn call(
        &self,
        proc: u32,
        input: &mut Cursor<&[u8]>,
        output: &mut XdrBuffer,
        context: &mut rpc::Context<'_>,
    ) -> ProcResult {
        handle_mount(proc, input, output, context)
    }
}

/// Main handler for MOUNT procedures.
///
/// The procedure numbers are the same in all three versions; only MNT's
/// reply differs.
///
/// # Arguments
///
/// * `proc` - Procedure number from the call header
/// * `input` - Input stream for reading procedure arguments
/// * `output` - Output stream for writing procedure results
/// * `context` - Call context holding the server state
pub fn handle_mount(
    proc: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &mut rpc::Context<'_>,
) -> ProcResult {
    let xid = context.xid;
    let Some(prog) = MountProgram::from_u32(proc) else {
        return Err(ProcError::NotImplemented);
    };

    match prog {
        MountProgram::MOUNTPROC_NULL => mountproc_null(xid, input, output),
        MountProgram::MOUNTPROC_MNT => mountproc_mnt(xid, input, output, context),
        MountProgram::MOUNTPROC_DUMP => mountproc_dump(xid, input, output, context),
        MountProgram::MOUNTPROC_UMNT => mountproc_umnt(xid, input, output, context),
        MountProgram::MOUNTPROC_UMNTALL => mountproc_umnt_all(xid, input, output, context),
        MountProgram::MOUNTPROC_EXPORT => mountproc_export(xid, input, output, context),
    }
}
