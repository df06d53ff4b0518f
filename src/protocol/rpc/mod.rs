//! ONC RPC version 2 call handling (RFC 5531).
//!
//! A request arrives as one complete record: a UDP datagram, or a TCP record
//! reassembled from its fragments by [`read_record`]. [`handle_rpc`] decodes
//! the call header, picks the program from the [`ServerRegistry`] and lets it
//! decode its arguments and encode its results into a bounded reply buffer.
//! Whatever the program reports (unknown procedure, undecodable arguments)
//! is turned into the matching accept status by patching the reply header,
//! so a request never tears down a connection.

mod context;
mod registry;
mod wire;

pub use context::{Context, Transport};
pub use registry::{
    ProcError, ProcResult, RegistryError, RpcProgram, ServerRegistry, MAX_PROGRAMS, PROGRAM_BASE,
};
pub use wire::{
    handle_rpc, read_record, write_fragment, MAX_RPC_RECORD_LENGTH, REPLY_BUFFER_CAPACITY,
};
