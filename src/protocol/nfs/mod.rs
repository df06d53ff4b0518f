//! RPC programs served by the gateway.
//!
//! - `v2` and `v3`: the NFS program (100003) as specified in RFC 1094 and
//!   RFC 1813. Both versions share one [`NfsService`] registration; the
//!   version in the call header selects the procedure table.
//!
//! - `mount`: the MOUNT program (100005, versions 1 to 3), which hands a client
//!   the root file handle of the export and keeps the list of mounted clients.
//!
//! - `portmap`: the PORTMAP program (100000, version 2), a static directory
//!   telling clients which port serves which program.
//!
//! - `bootparam`: the BOOTPARAM program (100026, version 1) answering the two
//!   questions a diskless client asks at boot: who am I, and where is my root.
//!
//! Every program implements [`rpc::RpcProgram`] and is invoked through the same
//! dispatcher; handlers write only their own result body after the reply header
//! the dispatcher has already written.

use std::io::Cursor;
use std::ops::RangeInclusive;

use crate::protocol::rpc::{self, ProcResult, RpcProgram};
use crate::protocol::xdr::{nfs2, nfs3, XdrBuffer};

pub mod bootparam;
pub mod mount;
pub mod portmap;
pub mod v2;
pub mod v3;

pub use bootparam::{BootParams, BootparamService};
pub use mount::{MountList, MountService};
pub use portmap::{PortmapService, PortmapTable};

/// The NFS program, versions 2 and 3.
#[derive(Debug, Default)]
pub struct NfsService;

impl RpcProgram for NfsService {
    fn program(&self) -> u32 {
        nfs3::PROGRAM
    }

    fn name(&self) -> &'static str {
        "nfs"
    }

    fn versions(&self) -> RangeInclusive<u32> {
        nfs2::VERSION..=nfs3::VERSION
    }

    fn call(
        &self,
        proc: u32,
        input: &mut Cursor<&[u8]>,
        output: &mut XdrBuffer,
        context: &mut rpc::Context<'_>,
    ) -> ProcResult {
        if context.vers == nfs2::VERSION {
            v2::handle_nfs2(proc, input, output, context)
        } else {
            v3::handle_nfs3(proc, input, output, context)
        }
    }
}
