mod support;

use nfs_gateway::fs_util::{S_IFCHR, S_IFIFO};
use nfs_gateway::xdr::nfs2::{self, fhandle, nfsstat};
use nfs_gateway::xdr::Serialize;

use support::{handle_id, lookup_v2, TestServer};

const PROG: u32 = nfs2::PROGRAM;

const GETATTR: u32 = 1;
const SETATTR: u32 = 2;
const READLINK: u32 = 5;
const READ: u32 = 6;
const WRITE: u32 = 8;
const CREATE: u32 = 9;
const REMOVE: u32 = 10;
const RENAME: u32 = 11;
const SYMLINK: u32 = 13;
const MKDIR: u32 = 14;
const RMDIR: u32 = 15;
const READDIR: u32 = 16;
const STATFS: u32 = 17;

async fn getattr(server: &mut TestServer, file: fhandle) -> Result<nfs2::fattr, nfsstat> {
    let mut reply = server.ok(PROG, 2, GETATTR, &file).await;
    match reply.decode::<nfsstat>() {
        nfsstat::NFS_OK => Ok(reply.decode::<nfs2::fattr>()),
        stat => Err(stat),
    }
}

async fn status_only(server: &mut TestServer, proc: u32, args: &impl Serialize) -> nfsstat {
    let mut reply = server.ok(PROG, 2, proc, args).await;
    let stat = reply.decode::<nfsstat>();
    assert_eq!(reply.remaining(), 0);
    stat
}

async fn create(
    server: &mut TestServer,
    dir: fhandle,
    name: &str,
    attributes: nfs2::sattr,
) -> Result<nfs2::diropokres, nfsstat> {
    let args = nfs2::createargs { dirops: nfs2::diropargs { dir, name: name.into() }, attributes };
    let mut reply = server.ok(PROG, 2, CREATE, &args).await;
    match reply.decode::<nfsstat>() {
        nfsstat::NFS_OK => Ok(reply.decode::<nfs2::diropokres>()),
        stat => Err(stat),
    }
}

/// One READDIR call: entry names, their cookies, and the eof flag.
async fn readdir(
    server: &mut TestServer,
    dir: fhandle,
    cookie: u32,
) -> (Vec<String>, Vec<u32>, bool) {
    let args = nfs2::readdirargs { dir, cookie: cookie.to_be_bytes(), count: 8192 };
    let mut reply = server.ok(PROG, 2, READDIR, &args).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    let mut names = Vec::new();
    let mut cookies = Vec::new();
    while reply.decode::<bool>() {
        let entry = reply.decode::<nfs2::entry>();
        names.push(entry.name.to_string());
        cookies.push(u32::from_be_bytes(entry.cookie));
    }
    let eof = reply.decode::<bool>();
    (names, cookies, eof)
}

#[tokio::test]
async fn lookup_finds_host_files() {
    let mut server = TestServer::new();
    server.write_file("foo.txt", b"hello");
    let root = server.root_v2().await;

    let found = lookup_v2(&mut server, root, "foo.txt").await.expect("foo.txt");
    assert_ne!(handle_id(&found.file.0), 0);
    assert_eq!(found.attributes.ftype, nfs2::ftype::NFREG);
    assert_eq!(found.attributes.size, 5);
    assert_eq!(found.file.0[8..], [0u8; 24]);

    // the same path always yields the same handle
    let again = lookup_v2(&mut server, root, "foo.txt").await.expect("foo.txt");
    assert_eq!(again.file, found.file);

    assert_eq!(lookup_v2(&mut server, root, "missing").await.unwrap_err(), nfsstat::NFSERR_NOENT);
}

#[tokio::test]
async fn dot_entries_resolve_within_the_export() {
    let mut server = TestServer::new();
    std::fs::create_dir(server.path("sub")).expect("mkdir");
    let root = server.root_v2().await;
    let sub = lookup_v2(&mut server, root, "sub").await.expect("sub").file;

    assert_eq!(lookup_v2(&mut server, sub, "..").await.expect("..").file, root);
    assert_eq!(lookup_v2(&mut server, sub, ".").await.expect(".").file, sub);
    // the parent of the root is the root
    assert_eq!(lookup_v2(&mut server, root, "..").await.expect("..").file, root);
}

#[tokio::test]
async fn stale_handles_are_reported() {
    let mut server = TestServer::new();
    let mut bogus = fhandle::default();
    bogus.0[..8].copy_from_slice(&0x1234_u64.to_be_bytes());
    assert_eq!(getattr(&mut server, bogus).await.unwrap_err(), nfsstat::NFSERR_STALE);
}

#[tokio::test]
async fn mode_is_kept_exactly_while_the_file_stays_writable() {
    let mut server = TestServer::new();
    server.write_file("f", b"");
    let root = server.root_v2().await;
    let file = lookup_v2(&mut server, root, "f").await.expect("f").file;

    let attributes = nfs2::sattr { mode: 0o400, ..Default::default() };
    let args = nfs2::sattrargs { file, attributes };
    let mut reply = server.ok(PROG, 2, SETATTR, &args).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    assert_eq!(reply.decode::<nfs2::fattr>().mode & 0o7777, 0o400);

    let write = nfs2::writeargs {
        file,
        beginoffset: 0,
        offset: 0,
        totalcount: 5,
        data: b"hello".to_vec(),
    };
    let mut reply = server.ok(PROG, 2, WRITE, &write).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    assert_eq!(reply.decode::<nfs2::fattr>().size, 5);

    let attrs = getattr(&mut server, file).await.expect("getattr");
    assert_eq!(attrs.mode & 0o7777, 0o400);
    assert_eq!(attrs.ftype, nfs2::ftype::NFREG);
    assert_eq!(std::fs::read(server.path("f")).expect("host file"), b"hello");
}

#[tokio::test]
async fn read_and_write_at_offsets() {
    let mut server = TestServer::new();
    server.write_file("data", b"0123456789");
    let root = server.root_v2().await;
    let file = lookup_v2(&mut server, root, "data").await.expect("data").file;

    let write =
        nfs2::writeargs { file, beginoffset: 0, offset: 12, totalcount: 2, data: b"AB".to_vec() };
    assert_eq!(server.ok(PROG, 2, WRITE, &write).await.decode::<nfsstat>(), nfsstat::NFS_OK);

    let read = nfs2::readargs { file, offset: 8, count: 100, totalcount: 0 };
    let mut reply = server.ok(PROG, 2, READ, &read).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    assert_eq!(reply.decode::<nfs2::fattr>().size, 14);
    assert_eq!(reply.decode::<Vec<u8>>(), b"89\0\0AB");

    let mut reply = server.ok(PROG, 2, READ, &nfs2::readargs { file: root, ..read }).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFSERR_ISDIR);
}

#[tokio::test]
async fn rename_keeps_the_handle() {
    let mut server = TestServer::new();
    server.write_file("a", b"contents");
    let root = server.root_v2().await;
    let before = lookup_v2(&mut server, root, "a").await.expect("a").file;

    let args = nfs2::renameargs {
        from: nfs2::diropargs { dir: root, name: "a".into() },
        to: nfs2::diropargs { dir: root, name: "b".into() },
    };
    assert_eq!(status_only(&mut server, RENAME, &args).await, nfsstat::NFS_OK);

    let after = lookup_v2(&mut server, root, "b").await.expect("b");
    assert_eq!(after.file, before);
    assert_eq!(lookup_v2(&mut server, root, "a").await.unwrap_err(), nfsstat::NFSERR_NOENT);
    // the old handle follows the object
    assert_eq!(getattr(&mut server, before).await.expect("getattr").size, 8);
}

#[tokio::test]
async fn readdir_pages_in_batches_and_hides_the_sidecar() {
    let mut server = TestServer::new();
    for i in 1..=13 {
        server.write_file(&format!("f{i:02}"), b"");
    }
    server.write_file(".nfsd_fattrs", b"");
    let root = server.root_v2().await;

    let (names, cookies, eof) = readdir(&mut server, root, 0).await;
    assert_eq!(names.len(), 10);
    assert!(!eof);
    assert_eq!(names[..3], [".", "..", "f01"]);
    assert_eq!(cookies, (1..=10).collect::<Vec<u32>>());

    let (rest, cookies, eof) = readdir(&mut server, root, 10).await;
    assert_eq!(rest, ["f09", "f10", "f11", "f12", "f13"]);
    assert_eq!(cookies, [11, 12, 13, 14, 15]);
    assert!(eof);
    assert!(!names.iter().chain(rest.iter()).any(|n| n == ".nfsd_fattrs"));

    let (past_end, _, eof) = readdir(&mut server, root, 15).await;
    assert!(past_end.is_empty());
    assert!(eof);
}

#[tokio::test]
async fn readdir_respects_the_byte_count() {
    let mut server = TestServer::new();
    server.write_file("a", b"");
    let root = server.root_v2().await;
    let args = nfs2::readdirargs { dir: root, cookie: [0; 4], count: 40 };
    let mut reply = server.ok(PROG, 2, READDIR, &args).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    // "." takes 20 bytes; ".." would not fit in the remaining 8
    assert!(reply.decode::<bool>());
    assert_eq!(reply.decode::<nfs2::entry>().name.to_string(), ".");
    assert!(!reply.decode::<bool>());
    assert!(!reply.decode::<bool>());
}

#[tokio::test]
async fn create_makes_device_nodes() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;
    let attributes = nfs2::sattr { mode: S_IFCHR | 0o620, size: 0x0c03, ..Default::default() };
    let node = create(&mut server, root, "ttyS0", attributes).await.expect("create");
    assert_eq!(node.attributes.ftype, nfs2::ftype::NFCHR);
    assert_eq!(node.attributes.rdev, 0x0c03);
    assert_eq!(node.attributes.mode, S_IFCHR | 0o620);
    assert!(server.path("ttyS0").is_file());

    let attributes = nfs2::sattr { mode: S_IFIFO | 0o644, ..Default::default() };
    let fifo = create(&mut server, root, "pipe", attributes).await.expect("create fifo");
    assert_eq!(fifo.attributes.ftype, nfs2::ftype::NFFIFO);

    // survives a flush and a lookup by name
    server.server.flush().await;
    let found = lookup_v2(&mut server, root, "ttyS0").await.expect("ttyS0");
    assert_eq!(found.attributes.ftype, nfs2::ftype::NFCHR);
    assert_eq!(found.attributes.rdev, 0x0c03);
}

#[tokio::test]
async fn create_refuses_reserved_names() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;
    let attrs = nfs2::sattr { mode: 0o644, ..Default::default() };
    let sidecar = create(&mut server, root, ".nfsd_fattrs", attrs).await;
    assert_eq!(sidecar.unwrap_err(), nfsstat::NFSERR_ACCES);
    let dotdot = create(&mut server, root, "..", attrs).await;
    assert_eq!(dotdot.unwrap_err(), nfsstat::NFSERR_EXIST);
    let long = create(&mut server, root, &"x".repeat(256), attrs).await;
    assert_eq!(long.unwrap_err(), nfsstat::NFSERR_NAMETOOLONG);
}

#[tokio::test]
async fn dev_directory_entries_look_like_devices() {
    let mut server = TestServer::new();
    std::fs::create_dir(server.path("dev")).expect("mkdir dev");
    server.write_file("dev/null", b"");
    server.write_file("dev/other", b"");
    let root = server.root_v2().await;
    let dev = lookup_v2(&mut server, root, "dev").await.expect("dev").file;

    let null = lookup_v2(&mut server, dev, "null").await.expect("null");
    assert_eq!(null.attributes.ftype, nfs2::ftype::NFCHR);
    assert_eq!(null.attributes.rdev, (3 << 8) | 2);
    let other = lookup_v2(&mut server, dev, "other").await.expect("other");
    assert_eq!(other.attributes.ftype, nfs2::ftype::NFREG);
}

#[tokio::test]
async fn directories_and_symlinks() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;

    let args = nfs2::createargs {
        dirops: nfs2::diropargs { dir: root, name: "d".into() },
        attributes: nfs2::sattr { mode: 0o700, ..Default::default() },
    };
    let mut reply = server.ok(PROG, 2, MKDIR, &args).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    let dir = reply.decode::<nfs2::diropokres>();
    assert_eq!(dir.attributes.ftype, nfs2::ftype::NFDIR);
    assert_eq!(dir.attributes.mode & 0o7777, 0o700);

    let link = nfs2::symlinkargs {
        from: nfs2::diropargs { dir: dir.file, name: "l".into() },
        to: "../target".into(),
        attributes: nfs2::sattr::default(),
    };
    assert_eq!(status_only(&mut server, SYMLINK, &link).await, nfsstat::NFS_OK);
    let l = lookup_v2(&mut server, dir.file, "l").await.expect("l");
    assert_eq!(l.attributes.ftype, nfs2::ftype::NFLNK);
    let mut reply = server.ok(PROG, 2, READLINK, &l.file).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    assert_eq!(reply.decode::<String>(), "../target");

    let rmdir = nfs2::diropargs { dir: root, name: "d".into() };
    assert_eq!(status_only(&mut server, RMDIR, &rmdir).await, nfsstat::NFSERR_NOTEMPTY);
    let remove = nfs2::diropargs { dir: dir.file, name: "l".into() };
    assert_eq!(status_only(&mut server, REMOVE, &remove).await, nfsstat::NFS_OK);
    assert_eq!(status_only(&mut server, RMDIR, &rmdir).await, nfsstat::NFS_OK);
    assert!(!server.path("d").exists());
    assert_eq!(getattr(&mut server, dir.file).await.unwrap_err(), nfsstat::NFSERR_STALE);
}

#[tokio::test]
async fn statfs_reports_sizes() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;
    let mut reply = server.ok(PROG, 2, STATFS, &root).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    let res = reply.decode::<nfs2::statfsokres>();
    assert_eq!(res.tsize, nfs2::MAXDATA);
    assert!(res.bsize > 0);
    assert!(res.bfree <= res.blocks);
}

#[tokio::test]
async fn read_only_exports_refuse_changes() {
    let mut server = TestServer::read_only();
    server.write_file("f", b"x");
    let root = server.root_v2().await;
    let file = lookup_v2(&mut server, root, "f").await.expect("f").file;

    let write = nfs2::writeargs { file, beginoffset: 0, offset: 0, totalcount: 1, data: vec![1] };
    assert_eq!(server.ok(PROG, 2, WRITE, &write).await.decode::<nfsstat>(), nfsstat::NFSERR_ROFS);
    let remove = nfs2::diropargs { dir: root, name: "f".into() };
    assert_eq!(status_only(&mut server, REMOVE, &remove).await, nfsstat::NFSERR_ROFS);
    assert!(server.path("f").exists());
}

#[tokio::test]
async fn symlinks_never_lead_outside_the_export() {
    let mut server = TestServer::new();
    let outside = tempfile::tempdir().expect("tempdir");
    let secret = outside.path().join("secret");
    std::fs::write(&secret, b"host-secret").expect("write secret");
    let root = server.root_v2().await;

    let link = nfs2::symlinkargs {
        from: nfs2::diropargs { dir: root, name: "l".into() },
        to: secret.to_str().expect("utf-8 path").into(),
        attributes: nfs2::sattr::default(),
    };
    assert_eq!(status_only(&mut server, SYMLINK, &link).await, nfsstat::NFS_OK);
    let l = lookup_v2(&mut server, root, "l").await.expect("l");
    assert_eq!(l.attributes.ftype, nfs2::ftype::NFLNK);

    let read = nfs2::readargs { file: l.file, offset: 0, count: 100, totalcount: 0 };
    assert_eq!(status_only(&mut server, READ, &read).await, nfsstat::NFSERR_IO);

    let write = nfs2::writeargs {
        file: l.file,
        beginoffset: 0,
        offset: 0,
        totalcount: 5,
        data: b"owned".to_vec(),
    };
    assert_eq!(status_only(&mut server, WRITE, &write).await, nfsstat::NFSERR_IO);

    let truncate = nfs2::sattrargs {
        file: l.file,
        attributes: nfs2::sattr { size: 0, ..Default::default() },
    };
    assert_ne!(status_only(&mut server, SETATTR, &truncate).await, nfsstat::NFS_OK);
    assert_eq!(std::fs::read(&secret).expect("secret"), b"host-secret");

    // a dangling link is an existing name, not a place to create through
    let planted = outside.path().join("planted");
    let dangling = nfs2::symlinkargs {
        from: nfs2::diropargs { dir: root, name: "d".into() },
        to: planted.to_str().expect("utf-8 path").into(),
        attributes: nfs2::sattr::default(),
    };
    assert_eq!(status_only(&mut server, SYMLINK, &dangling).await, nfsstat::NFS_OK);
    let attrs = nfs2::sattr { mode: 0o644, ..Default::default() };
    assert_eq!(create(&mut server, root, "d", attrs).await.unwrap_err(), nfsstat::NFSERR_EXIST);
    assert!(!planted.exists());
}

#[tokio::test]
async fn readdir_always_makes_progress() {
    let mut server = TestServer::new();
    let root = server.root_v2().await;
    let args = nfs2::readdirargs { dir: root, cookie: [0; 4], count: 8 };
    let mut reply = server.ok(PROG, 2, READDIR, &args).await;
    assert_eq!(reply.decode::<nfsstat>(), nfsstat::NFS_OK);
    assert!(reply.decode::<bool>());
    let entry = reply.decode::<nfs2::entry>();
    assert_eq!(entry.name.to_string(), ".");
    assert_eq!(u32::from_be_bytes(entry.cookie), 1);
    assert!(!reply.decode::<bool>());
    assert!(!reply.decode::<bool>(), "\"..\" is still to come");
    assert_eq!(reply.remaining(), 0);
}
