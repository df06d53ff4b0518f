mod support;

use std::net::Ipv4Addr;

use nfs_gateway::xdr::bootparam::{
    self, bp_address, bp_getfile_arg, bp_getfile_res, bp_whoami_arg, bp_whoami_res,
};
use nfs_gateway::xdr::mount::{self, mountbody, mountres3_ok, mountstat3};
use nfs_gateway::xdr::portmap::{self, mapping, IPPROTO_TCP, IPPROTO_UDP};
use nfs_gateway::xdr::{nfs2, nfs3};

use support::{handle_id, lookup_v3, unix_cred, TestServer, Void, EXPORT_NAME, NFS_PORT};

const MNT: u32 = 1;
const DUMP: u32 = 2;
const UMNT: u32 = 3;
const UMNTALL: u32 = 4;
const EXPORT: u32 = 5;

async fn mount_v3(server: &mut TestServer, path: &str) -> Result<mountres3_ok, mountstat3> {
    let mut reply = server.ok(mount::PROGRAM, 3, MNT, &path.to_string()).await;
    match reply.decode::<mountstat3>() {
        mountstat3::MNT3_OK => Ok(reply.decode::<mountres3_ok>()),
        stat => {
            assert_eq!(reply.remaining(), 0);
            Err(stat)
        }
    }
}

async fn dump(server: &mut TestServer) -> Vec<mountbody> {
    let mut reply = server.ok(mount::PROGRAM, 3, DUMP, &Void).await;
    let mut mounts = Vec::new();
    while reply.decode::<bool>() {
        mounts.push(reply.decode::<mountbody>());
    }
    mounts
}

async fn pmap_dump(server: &mut TestServer) -> Vec<mapping> {
    let mut reply = server.ok(portmap::PROGRAM, 2, 4, &Void).await;
    let mut maps = Vec::new();
    while reply.decode::<bool>() {
        maps.push(reply.decode::<mapping>());
    }
    maps
}

#[tokio::test]
async fn mount_handles_depend_on_the_version() {
    let mut server = TestServer::new();
    let v3 = mount_v3(&mut server, EXPORT_NAME).await.expect("mount");
    assert_eq!(v3.fhandle.len(), nfs3::NFS3_FHSIZE as usize);
    assert!(v3.auth_flavors.contains(&1), "AUTH_UNIX is offered");

    for vers in [1, 2] {
        let mut reply = server.ok(mount::PROGRAM, vers, MNT, &EXPORT_NAME.to_string()).await;
        assert_eq!(reply.decode::<mountstat3>(), mountstat3::MNT3_OK);
        let fhandle = reply.decode::<nfs2::fhandle>();
        assert_eq!(reply.remaining(), 0);
        assert_eq!(handle_id(&fhandle.0), handle_id(&v3.fhandle));
        assert!(fhandle.0[8..].iter().all(|b| *b == 0));
    }
}

#[tokio::test]
async fn mount_accepts_directories_below_the_export() {
    let mut server = TestServer::new();
    std::fs::create_dir(server.path("sub")).expect("mkdir");
    server.write_file("plain", b"");

    let sub = mount_v3(&mut server, "/export/sub").await.expect("mount sub");
    let root = server.root_v3().await;
    let (looked_up, _) = lookup_v3(&mut server, &root, "sub").await.expect("lookup");
    assert_eq!(sub.fhandle, looked_up.data);

    assert_eq!(mount_v3(&mut server, "/elsewhere").await.unwrap_err(), mountstat3::MNT3ERR_NOENT);
    let missing = mount_v3(&mut server, "/export/missing").await;
    assert_eq!(missing.unwrap_err(), mountstat3::MNT3ERR_NOENT);
    let file = mount_v3(&mut server, "/export/plain").await;
    assert_eq!(file.unwrap_err(), mountstat3::MNT3ERR_NOTDIR);
}

#[tokio::test]
async fn mount_list_tracks_clients() {
    let mut server = TestServer::new();
    server.cred = unix_cred("sun3", 0, 0);
    mount_v3(&mut server, EXPORT_NAME).await.expect("mount");
    mount_v3(&mut server, EXPORT_NAME).await.expect("mount again");
    std::fs::create_dir(server.path("home")).expect("mkdir");
    mount_v3(&mut server, "/export/home").await.expect("mount home");

    let mounts = dump(&mut server).await;
    let dirs: Vec<&str> = mounts.iter().map(|m| m.directory.as_str()).collect();
    assert_eq!(dirs, [EXPORT_NAME, "/export/home"]);
    assert!(mounts.iter().all(|m| m.hostname == "sun3"));

    let reply = server.ok(mount::PROGRAM, 3, UMNT, &EXPORT_NAME.to_string()).await;
    assert_eq!(reply.remaining(), 0);
    assert_eq!(dump(&mut server).await.len(), 1);

    // clients without AUTH_UNIX are known by address
    server.cred = Default::default();
    mount_v3(&mut server, EXPORT_NAME).await.expect("mount");
    let mounts = dump(&mut server).await;
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[1].hostname, "10.0.2.15");

    server.cred = unix_cred("sun3", 0, 0);
    server.ok(mount::PROGRAM, 3, UMNTALL, &Void).await;
    let mounts = dump(&mut server).await;
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].hostname, "10.0.2.15");
}

#[tokio::test]
async fn export_lists_the_single_export() {
    let mut server = TestServer::new();
    let mut reply = server.ok(mount::PROGRAM, 3, EXPORT, &Void).await;
    assert!(reply.decode::<bool>());
    assert_eq!(reply.decode::<String>(), EXPORT_NAME);
    assert!(!reply.decode::<bool>(), "no groups");
    assert!(!reply.decode::<bool>(), "one export");
    assert_eq!(reply.remaining(), 0);
}

#[tokio::test]
async fn portmap_lists_every_program_and_version() {
    let mut server = TestServer::new();
    let maps = pmap_dump(&mut server).await;
    // portmap 2, nfs 2..=3, mount 1..=3, bootparam 1; each on TCP and UDP
    assert_eq!(maps.len(), 14);
    for prot in [IPPROTO_TCP, IPPROTO_UDP] {
        assert!(maps.contains(&mapping {
            prog: portmap::PROGRAM,
            vers: 2,
            prot,
            port: u32::from(support::PORTMAP_PORT),
        }));
        assert!(maps.contains(&mapping { prog: nfs3::PROGRAM, vers: 2, prot, port: 2049 }));
        assert!(maps.contains(&mapping { prog: mount::PROGRAM, vers: 1, prot, port: 2049 }));
    }
}

#[tokio::test]
async fn getport_answers_zero_for_unknown_programs() {
    let mut server = TestServer::new();
    let cases = [
        (nfs3::PROGRAM, 3, IPPROTO_TCP, u32::from(NFS_PORT)),
        (mount::PROGRAM, 3, IPPROTO_UDP, u32::from(NFS_PORT)),
        (bootparam::PROGRAM, 1, IPPROTO_UDP, u32::from(NFS_PORT)),
        (nfs3::PROGRAM, 4, IPPROTO_TCP, 0),
        (100021, 1, IPPROTO_UDP, 0),
    ];
    for (prog, vers, prot, port) in cases {
        let query = mapping { prog, vers, prot, port: 0 };
        let mut reply = server.ok(portmap::PROGRAM, 2, 3, &query).await;
        assert_eq!(reply.decode::<u32>(), port, "program {prog} version {vers}");
    }
}

#[tokio::test]
async fn bootparam_whoami_names_the_client() {
    let mut server = TestServer::new();
    let args = bp_whoami_arg { client_address: bp_address(Ipv4Addr::new(10, 0, 2, 15)) };
    let mut reply = server.ok(bootparam::PROGRAM, 1, 1, &args).await;
    let res = reply.decode::<bp_whoami_res>();
    assert_eq!(res.client_name, "guest");
    assert_eq!(res.domain_name, "");
    assert_eq!(res.router_address, bp_address(Ipv4Addr::new(10, 0, 2, 2)));
    assert_eq!(reply.remaining(), 0);
}

#[tokio::test]
async fn bootparam_getfile_knows_only_root() {
    let mut server = TestServer::new();
    let args = bp_getfile_arg { client_name: "guest".into(), file_id: "root".into() };
    let mut reply = server.ok(bootparam::PROGRAM, 1, 2, &args).await;
    let res = reply.decode::<bp_getfile_res>();
    assert_eq!(res.server_name, "gateway");
    assert_eq!(res.server_address, bp_address(Ipv4Addr::new(10, 0, 2, 2)));
    assert_eq!(res.server_path, EXPORT_NAME);

    let args = bp_getfile_arg { client_name: "guest".into(), file_id: "swap".into() };
    let mut reply = server.ok(bootparam::PROGRAM, 1, 2, &args).await;
    let res = reply.decode::<bp_getfile_res>();
    assert_eq!(res.server_path, "");
}
