use std::sync::Arc;
use std::time::Duration;

mod support;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use nfs_gateway::protocol::rpc::Transport;
use nfs_gateway::tcp::NfsTcpListener;
use nfs_gateway::udp::NfsUdpSocket;
use nfs_gateway::xdr::rpc::{
    accept_body, mismatch_info, opaque_auth, rejected_reply, reply_body, CALL,
};
use nfs_gateway::xdr::{bootparam, mount, nfs2, nfs3, portmap, Serialize};

use support::{encode_call, Reply, TestServer, Void};

#[tokio::test]
async fn null_is_answered_by_every_program() {
    let mut server = TestServer::new();
    let programs = [
        (portmap::PROGRAM, 2),
        (nfs3::PROGRAM, 2),
        (nfs3::PROGRAM, 3),
        (mount::PROGRAM, 1),
        (bootparam::PROGRAM, 1),
    ];
    for (prog, vers) in programs {
        let reply = server.ok(prog, vers, 0, &Void).await;
        assert_eq!(reply.remaining(), 0, "program {prog} v{vers}");
    }
}

#[tokio::test]
async fn unregistered_program_is_unavailable() {
    let mut server = TestServer::new();
    assert_eq!(server.call(100021, 4, 0, &Void).await.accept(), accept_body::PROG_UNAVAIL);
    assert_eq!(server.call(7, 1, 0, &Void).await.accept(), accept_body::PROG_UNAVAIL);
}

#[tokio::test]
async fn unknown_procedure_is_unavailable() {
    let mut server = TestServer::new();
    assert_eq!(server.call(nfs3::PROGRAM, 3, 99, &Void).await.accept(), accept_body::PROC_UNAVAIL);
    assert_eq!(server.call(mount::PROGRAM, 3, 99, &Void).await.accept(), accept_body::PROC_UNAVAIL);
}

#[tokio::test]
async fn obsolete_v2_procedures_are_unavailable() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;
    for proc in [3, 7] {
        let reply = server.call(nfs2::PROGRAM, 2, proc, &root).await;
        assert_eq!(reply.accept(), accept_body::PROC_UNAVAIL);
        assert_eq!(reply.remaining(), 0);
    }
}

#[tokio::test]
async fn unsupported_version_reports_the_range() {
    let mut server = TestServer::new();
    let reply = server.call(nfs3::PROGRAM, 4, 0, &Void).await;
    assert_eq!(reply.accept(), accept_body::PROG_MISMATCH(mismatch_info { low: 2, high: 3 }));
    let reply = server.call(mount::PROGRAM, 0, 0, &Void).await;
    assert_eq!(reply.accept(), accept_body::PROG_MISMATCH(mismatch_info { low: 1, high: 3 }));
}

#[tokio::test]
async fn wrong_rpc_version_is_denied() {
    let server = TestServer::new();
    let mut msg = encode_call(5, nfs3::PROGRAM, 3, 0, &opaque_auth::default(), &Void);
    // rpcvers follows xid and msg_type
    msg[8..12].copy_from_slice(&3_u32.to_be_bytes());
    let reply = Reply::parse(server.raw(Transport::Udp, &msg).await.expect("reply"));
    assert_eq!(reply.xid, 5);
    match reply.body {
        reply_body::MSG_DENIED(rejected_reply::RPC_MISMATCH(range)) => {
            assert_eq!(range, mismatch_info { low: 2, high: 2 });
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn truncated_header_is_garbage() {
    let server = TestServer::new();
    let msg = encode_call(9, nfs3::PROGRAM, 3, 0, &opaque_auth::default(), &Void);
    // cut inside the program number
    let reply = Reply::parse(server.raw(Transport::Udp, &msg[..14]).await.expect("reply"));
    assert_eq!(reply.xid, 9);
    assert_eq!(reply.accept(), accept_body::GARBAGE_ARGS);
}

#[tokio::test]
async fn truncated_arguments_are_garbage() {
    let mut server = TestServer::new();
    // GETATTR without its handle
    let reply = server.call(nfs3::PROGRAM, 3, 1, &Void).await;
    assert_eq!(reply.accept(), accept_body::GARBAGE_ARGS);
    assert_eq!(reply.remaining(), 0);
    // v2 LOOKUP with half a handle
    let reply = server.call(nfs2::PROGRAM, 2, 4, &[0u8; 16]).await;
    assert_eq!(reply.accept(), accept_body::GARBAGE_ARGS);
}

#[tokio::test]
async fn non_calls_and_runts_are_dropped() {
    let server = TestServer::new();
    assert!(server.raw(Transport::Udp, &[0, 0, 1]).await.is_none());
    let mut reply_msg = Vec::new();
    7_u32.serialize(&mut reply_msg).expect("xid");
    (CALL + 1).serialize(&mut reply_msg).expect("msg_type");
    assert!(server.raw(Transport::Udp, &reply_msg).await.is_none());
}

#[tokio::test]
async fn auth_unix_credentials_are_accepted() {
    let mut server = TestServer::new();
    server.cred = support::unix_cred("guest", 100, 10);
    let reply = server.ok(nfs3::PROGRAM, 3, 0, &Void).await;
    assert_eq!(reply.remaining(), 0);
}

#[tokio::test]
async fn stream_replies_carry_a_record_mark() {
    let server = TestServer::new();
    let msg = encode_call(11, nfs3::PROGRAM, 3, 0, &opaque_auth::default(), &Void);
    let bytes = server.raw(Transport::Tcp, &msg).await.expect("reply");
    let reply = Reply::parse_tcp(bytes);
    assert_eq!(reply.xid, 11);
    assert_eq!(reply.accept(), accept_body::SUCCESS);
}

#[tokio::test]
async fn tcp_listener_serves_fragmented_records() {
    let test = TestServer::new();
    let support::TestServer { dir: _dir, server, .. } = test;
    let server = Arc::new(server);
    let listener = NfsTcpListener::bind("127.0.0.1:0", Arc::clone(&server)).await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = listener.handle_forever().await;
    });

    let mut socket = TcpStream::connect(addr).await.expect("connect");
    let msg = encode_call(21, nfs3::PROGRAM, 3, 0, &opaque_auth::default(), &Void);
    let (head, tail) = msg.split_at(10);
    socket.write_all(&(head.len() as u32).to_be_bytes()).await.expect("first mark");
    socket.write_all(head).await.expect("first fragment");
    socket.write_all(&((1 << 31) | tail.len() as u32).to_be_bytes()).await.expect("last mark");
    socket.write_all(tail).await.expect("last fragment");

    let mut mark = [0u8; 4];
    timeout(Duration::from_secs(5), socket.read_exact(&mut mark))
        .await
        .expect("reply timeout")
        .expect("read mark");
    let length = (u32::from_be_bytes(mark) & !(1 << 31)) as usize;
    let mut body = vec![0u8; length];
    socket.read_exact(&mut body).await.expect("read reply");
    let reply = Reply::parse(body);
    assert_eq!(reply.xid, 21);
    assert_eq!(reply.accept(), accept_body::SUCCESS);

    // the connection survives a bad call
    let bad = encode_call(22, 424242, 1, 0, &opaque_auth::default(), &Void);
    socket.write_all(&((1 << 31) | bad.len() as u32).to_be_bytes()).await.expect("mark");
    socket.write_all(&bad).await.expect("call");
    socket.read_exact(&mut mark).await.expect("read mark");
    let length = (u32::from_be_bytes(mark) & !(1 << 31)) as usize;
    let mut body = vec![0u8; length];
    socket.read_exact(&mut body).await.expect("read reply");
    assert_eq!(Reply::parse(body).accept(), accept_body::PROG_UNAVAIL);
}

#[tokio::test]
async fn udp_socket_answers_datagrams() {
    let support::TestServer { dir: _dir, server, .. } = TestServer::new();
    let server = Arc::new(server);
    let socket = NfsUdpSocket::bind("127.0.0.1:0", Arc::clone(&server)).await.expect("bind");
    let addr = socket.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = socket.handle_forever().await;
    });

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client socket");
    // runts are dropped silently; the next datagram still gets its answer
    client.send_to(&[0, 0], addr).await.expect("send runt");
    let msg = encode_call(31, portmap::PROGRAM, 2, 0, &opaque_auth::default(), &Void);
    client.send_to(&msg, addr).await.expect("send call");

    let mut buf = vec![0u8; 1024];
    let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("reply timeout")
        .expect("receive");
    let reply = Reply::parse(buf[..len].to_vec());
    assert_eq!(reply.xid, 31);
    assert_eq!(reply.accept(), accept_body::SUCCESS);
}
