#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;

use tempfile::TempDir;

use nfs_gateway::filetable::{DeviceTable, FileTable};
use nfs_gateway::protocol::nfs::BootParams;
use nfs_gateway::protocol::rpc::Transport;
use nfs_gateway::server::{NfsServer, ServerState};
use nfs_gateway::vfs::Vfs;
use nfs_gateway::xdr::rpc::{
    accept_body, auth_flavor, auth_unix, call_body, opaque_auth, reply_body, rpc_body, rpc_msg,
};
use nfs_gateway::xdr::{deserialize, mount, nfs2, nfs3, Deserialize, Serialize};

pub const EXPORT_NAME: &str = "/export";
pub const NFS_PORT: u16 = 2049;
pub const PORTMAP_PORT: u16 = 111;

pub fn client_addr() -> SocketAddr {
    "10.0.2.15:1023".parse().expect("client address")
}

/// AUTH_UNIX credentials for `machine` with the given ids.
pub fn unix_cred(machine: &str, uid: u32, gid: u32) -> opaque_auth {
    let auth = auth_unix {
        stamp: 0,
        machinename: machine.as_bytes().to_vec(),
        uid,
        gid,
        gids: vec![gid],
    };
    let mut body = Vec::new();
    auth.serialize(&mut body).expect("serialize auth_unix");
    opaque_auth { flavor: auth_flavor::AUTH_UNIX as u32, body }
}

/// Encodes a complete CALL message.
pub fn encode_call(
    xid: u32,
    prog: u32,
    vers: u32,
    proc: u32,
    cred: &opaque_auth,
    args: &impl Serialize,
) -> Vec<u8> {
    let call = call_body {
        rpcvers: 2,
        prog,
        vers,
        proc,
        cred: cred.clone(),
        verf: opaque_auth::default(),
    };
    let msg = rpc_msg { xid, body: rpc_body::CALL(call) };
    let mut buf = Vec::new();
    msg.serialize(&mut buf).expect("serialize call");
    args.serialize(&mut buf).expect("serialize args");
    buf
}

/// No arguments.
pub struct Void;

impl Serialize for Void {
    fn serialize<W: std::io::Write>(&self, _: &mut W) -> std::io::Result<()> {
        Ok(())
    }
}

/// Arguments encoded by hand.
pub struct Raw(pub Vec<u8>);

impl Serialize for Raw {
    fn serialize<W: std::io::Write>(&self, dest: &mut W) -> std::io::Result<()> {
        dest.write_all(&self.0)
    }
}

/// A decoded reply header with the unread result body behind it.
pub struct Reply {
    pub xid: u32,
    pub body: reply_body,
    rest: Cursor<Vec<u8>>,
}

impl Reply {
    /// Parses a UDP-style reply (no record mark).
    pub fn parse(bytes: Vec<u8>) -> Reply {
        let mut rest = Cursor::new(bytes);
        let msg = deserialize::<rpc_msg>(&mut rest).expect("reply header");
        let rpc_body::REPLY(body) = msg.body else {
            panic!("not a reply: {:?}", msg.body);
        };
        Reply { xid: msg.xid, body, rest }
    }

    /// Parses a TCP reply, checking its record mark.
    pub fn parse_tcp(bytes: Vec<u8>) -> Reply {
        let mark = u32::from_be_bytes(bytes[..4].try_into().expect("record mark"));
        assert_eq!(mark & (1 << 31), 1 << 31, "last fragment bit");
        assert_eq!((mark & !(1 << 31)) as usize, bytes.len() - 4, "fragment length");
        Reply::parse(bytes[4..].to_vec())
    }

    pub fn accept(&self) -> accept_body {
        match &self.body {
            reply_body::MSG_ACCEPTED(reply) => reply.reply_data.clone(),
            reply_body::MSG_DENIED(denied) => panic!("call denied: {:?}", denied),
        }
    }

    pub fn decode<T: Deserialize + Default>(&mut self) -> T {
        deserialize::<T>(&mut self.rest).expect("decode result")
    }

    pub fn remaining(&self) -> usize {
        self.rest.get_ref().len() - self.rest.position() as usize
    }
}

pub struct TestServer {
    pub dir: TempDir,
    pub server: NfsServer,
    pub cred: opaque_auth,
    next_xid: u32,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_options(false)
    }

    pub fn read_only() -> Self {
        Self::with_options(true)
    }

    fn with_options(read_only: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = FileTable::new(dir.path(), DeviceTable::default()).expect("file table");
        let vfs = Vfs::new(files, read_only);
        let state = ServerState::new(vfs, EXPORT_NAME, BootParams::default());
        let server = NfsServer::new(state, NFS_PORT, PORTMAP_PORT).expect("server");
        TestServer { dir, server, cred: opaque_auth::default(), next_xid: 1 }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write_file(&self, rel: &str, contents: &[u8]) {
        std::fs::write(self.path(rel), contents).expect("write host file");
    }

    pub async fn raw(&self, transport: Transport, bytes: &[u8]) -> Option<Vec<u8>> {
        self.server.handle(transport, bytes, client_addr()).await
    }

    /// Sends a call over the datagram path and parses the reply.
    pub async fn call(&mut self, prog: u32, vers: u32, proc: u32, args: &impl Serialize) -> Reply {
        let xid = self.next_xid;
        self.next_xid += 1;
        let msg = encode_call(xid, prog, vers, proc, &self.cred, args);
        let bytes = self.raw(Transport::Udp, &msg).await.expect("a reply");
        let reply = Reply::parse(bytes);
        assert_eq!(reply.xid, xid);
        reply
    }

    /// Calls a procedure that must be accepted and returns its body.
    pub async fn ok(&mut self, prog: u32, vers: u32, proc: u32, args: &impl Serialize) -> Reply {
        let reply = self.call(prog, vers, proc, args).await;
        assert_eq!(reply.accept(), accept_body::SUCCESS);
        reply
    }

    /// Root handle through MOUNT version 3.
    pub async fn root_v3(&mut self) -> nfs3::nfs_fh3 {
        let mut reply = self.ok(mount::PROGRAM, 3, 1, &EXPORT_NAME.to_string()).await;
        assert_eq!(reply.decode::<mount::mountstat3>(), mount::mountstat3::MNT3_OK);
        let res = reply.decode::<mount::mountres3_ok>();
        nfs3::nfs_fh3 { data: res.fhandle }
    }

    /// Root handle through MOUNT version 1.
    pub async fn root_v2(&mut self) -> nfs2::fhandle {
        let mut reply = self.ok(mount::PROGRAM, 1, 1, &EXPORT_NAME.to_string()).await;
        assert_eq!(reply.decode::<mount::mountstat3>(), mount::mountstat3::MNT3_OK);
        reply.decode::<nfs2::fhandle>()
    }
}

/// NFSv2 LOOKUP; the handle and attributes on success.
pub async fn lookup_v2(
    server: &mut TestServer,
    dir: nfs2::fhandle,
    name: &str,
) -> Result<nfs2::diropokres, nfs2::nfsstat> {
    let args = nfs2::diropargs { dir, name: name.into() };
    let mut reply = server.ok(nfs2::PROGRAM, 2, 4, &args).await;
    match reply.decode::<nfs2::nfsstat>() {
        nfs2::nfsstat::NFS_OK => Ok(reply.decode::<nfs2::diropokres>()),
        stat => Err(stat),
    }
}

/// NFSv3 LOOKUP; the handle and object attributes on success.
pub async fn lookup_v3(
    server: &mut TestServer,
    dir: &nfs3::nfs_fh3,
    name: &str,
) -> Result<(nfs3::nfs_fh3, nfs3::fattr3), nfs3::nfsstat3> {
    let args = nfs3::diropargs3 { dir: dir.clone(), name: name.into() };
    let mut reply = server.ok(nfs3::PROGRAM, 3, 3, &args).await;
    match reply.decode::<nfs3::nfsstat3>() {
        nfs3::nfsstat3::NFS3_OK => {
            let handle = reply.decode::<nfs3::nfs_fh3>();
            let attrs = reply.decode::<nfs3::post_op_attr>().expect("object attributes");
            Ok((handle, attrs))
        }
        stat => Err(stat),
    }
}

pub fn handle_id(data: &[u8]) -> u64 {
    u64::from_be_bytes(data[..8].try_into().expect("8 id bytes"))
}
