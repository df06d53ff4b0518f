//! Per-call state handed to every procedure handler.

use std::fmt;
use std::net::SocketAddr;

use crate::protocol::xdr;
use crate::server::ServerState;
use crate::vfs::Owner;

/// Socket kind a request arrived on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// Stream socket; replies carry a record mark.
    Tcp,
    /// Datagram socket; one message per datagram.
    Udp,
}

/// Execution context of one RPC call.
///
/// Built by the dispatcher for the duration of a single call, while the
/// server lock is held, so handlers get exclusive access to the whole
/// [`ServerState`].
pub struct Context<'a> {
    pub xid: u32,
    /// Program version the client asked for.
    pub vers: u32,
    pub transport: Transport,
    pub client_addr: SocketAddr,
    /// AUTH_UNIX credentials, when the call carried them.
    pub auth: Option<xdr::rpc::auth_unix>,
    pub state: &'a mut ServerState,
}

impl Context<'_> {
    /// Owner for objects the caller creates.
    pub fn owner(&self) -> Option<Owner> {
        self.auth.as_ref().map(|auth| Owner { uid: auth.uid, gid: auth.gid })
    }

    /// Client host name from the credentials, else its address.
    pub fn client_name(&self) -> String {
        match &self.auth {
            Some(auth) if !auth.machinename.is_empty() => {
                String::from_utf8_lossy(&auth.machinename).into_owned()
            }
            _ => self.client_addr.ip().to_string(),
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rpc::Context")
            .field("xid", &self.xid)
            .field("vers", &self.vers)
            .field("transport", &self.transport)
            .field("client_addr", &self.client_addr)
            .field("auth", &self.auth)
            .finish()
    }
}
