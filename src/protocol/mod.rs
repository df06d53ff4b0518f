//! The ONC RPC protocol suite spoken by the gateway.
//!
//! This module contains three main components:
//!
//! - `xdr`: External Data Representation (XDR) for serialization and deserialization
//!   of data structures according to RFC 1832.
//!
//! - `rpc`: call header decoding, the program registry and the dispatcher that turns
//!   handler outcomes into accept statuses (RFC 5531).
//!
//! - `nfs`: the procedure handlers of NFSv2 (RFC 1094), NFSv3 (RFC 1813), MOUNT,
//!   PORTMAP and BOOTPARAM.
//!
//! NFS is stateless: clients name files by opaque handles rather than paths, and
//! every call carries everything the server needs to answer it.

pub mod nfs;
pub mod rpc;
pub mod xdr;
