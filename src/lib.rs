//! NFS gateway: exports one host directory to a guest over NFSv2 and NFSv3.
//!
//! The host file system cannot hold everything a Unix guest expects (owners,
//! exact permission bits, device nodes), so those attributes live in a
//! per-directory shadow store next to the files and are merged into every
//! reply. Guests find the server through the usual ONC RPC companions:
//! PORTMAP, MOUNT and BOOTPARAM are served from the same dispatcher.
//!
//! ## Main Components
//!
//! - `protocol`: XDR codecs, the RPC dispatcher and one handler per procedure
//!   of every program.
//!
//! - `filetable`: stable file handles for export paths, the attribute shadow
//!   store and the device table.
//!
//! - `vfs`: procedure semantics shared by NFSv2 and NFSv3.
//!
//! - `server`, `tcp`, `udp`: shared state and the transports feeding it.
//!
//! ## Standards Compliance
//!
//! - RFC 1094: NFS: Network File System Protocol Specification (version 2)
//! - RFC 1813: NFS Version 3 Protocol Specification
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 1832: XDR: External Data Representation Standard
//! - RFC 1833: Binding Protocols for ONC RPC Version 2

pub mod config;
pub mod filetable;
pub mod fs_util;
pub mod protocol;
pub mod server;
pub mod tcp;
pub mod udp;
pub mod vfs;
mod write_counter;

pub use protocol::xdr;
