//! Host file system helpers: `stat` conversion into protocol attributes,
//! mode bit handling, settable-attribute normalization and errno mapping.

use std::fs::{Metadata, OpenOptions, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::debug;

use crate::protocol::xdr::{nfs2, nfs3};

pub const S_IFMT: u32 = 0o170000;
pub const S_IFSOCK: u32 = 0o140000;
pub const S_IFLNK: u32 = 0o120000;
pub const S_IFREG: u32 = 0o100000;
pub const S_IFBLK: u32 = 0o060000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFCHR: u32 = 0o020000;
pub const S_IFIFO: u32 = 0o010000;
pub const S_IWUSR: u32 = 0o200;
pub const S_IXUSR: u32 = 0o100;

/// Permission, set-id and sticky bits.
pub const MODE_PERM_MASK: u32 = 0o7777;

/// Packs a device number the way the guest expects it: `major << 8 | minor`.
pub fn make_rdev(major: u32, minor: u32) -> u32 {
    (major << 8) | (minor & 0xff)
}

pub fn rdev_major(rdev: u32) -> u32 {
    rdev >> 8
}

pub fn rdev_minor(rdev: u32) -> u32 {
    rdev & 0xff
}

#[cfg(target_os = "linux")]
fn host_rdev(dev: u64) -> u32 {
    let major = ((dev >> 8) & 0xfff) | ((dev >> 32) & !0xfff);
    let minor = (dev & 0xff) | ((dev >> 12) & !0xff);
    make_rdev(major as u32, minor as u32)
}

#[cfg(not(target_os = "linux"))]
fn host_rdev(dev: u64) -> u32 {
    make_rdev(((dev >> 24) & 0xff) as u32, (dev & 0xffffff) as u32)
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: u32,
    pub nseconds: u32,
}

impl Timestamp {
    fn from_parts(seconds: i64, nseconds: i64) -> Self {
        Timestamp { seconds: seconds as u32, nseconds: nseconds as u32 }
    }
}

impl From<Timestamp> for filetime::FileTime {
    fn from(time: Timestamp) -> Self {
        filetime::FileTime::from_unix_time(i64::from(time.seconds), time.nseconds)
    }
}

/// File type as decoded from the format bits of a mode word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileKind {
    None,
    Regular,
    Directory,
    BlockDevice,
    CharDevice,
    Symlink,
    Socket,
    Fifo,
}

impl FileKind {
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileKind::Regular,
            S_IFDIR => FileKind::Directory,
            S_IFBLK => FileKind::BlockDevice,
            S_IFCHR => FileKind::CharDevice,
            S_IFLNK => FileKind::Symlink,
            S_IFSOCK => FileKind::Socket,
            S_IFIFO => FileKind::Fifo,
            _ => FileKind::None,
        }
    }
}

impl From<FileKind> for nfs2::ftype {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::None => nfs2::ftype::NFNON,
            FileKind::Regular => nfs2::ftype::NFREG,
            FileKind::Directory => nfs2::ftype::NFDIR,
            FileKind::BlockDevice => nfs2::ftype::NFBLK,
            FileKind::CharDevice => nfs2::ftype::NFCHR,
            FileKind::Symlink => nfs2::ftype::NFLNK,
            FileKind::Socket => nfs2::ftype::NFSOCK,
            FileKind::Fifo => nfs2::ftype::NFFIFO,
        }
    }
}

/// Version 3 has no "none" type; unknown objects are reported as regular files.
impl From<FileKind> for nfs3::ftype3 {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::None | FileKind::Regular => nfs3::ftype3::NF3REG,
            FileKind::Directory => nfs3::ftype3::NF3DIR,
            FileKind::BlockDevice => nfs3::ftype3::NF3BLK,
            FileKind::CharDevice => nfs3::ftype3::NF3CHR,
            FileKind::Symlink => nfs3::ftype3::NF3LNK,
            FileKind::Socket => nfs3::ftype3::NF3SOCK,
            FileKind::Fifo => nfs3::ftype3::NF3FIFO,
        }
    }
}

/// Attributes of one object as the client will see them.
///
/// Built from an `lstat` of the host object and then adjusted by the device
/// table and the attribute store (see `FileTable::attributes`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FileAttrs {
    pub dev: u64,
    pub ino: u64,
    pub fileid: u64,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub size: u64,
    pub used: u64,
    pub blksize: u32,
    pub atime: Timestamp,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
}

impl FileAttrs {
    pub fn from_metadata(meta: &Metadata) -> Self {
        FileAttrs {
            dev: meta.dev(),
            ino: meta.ino(),
            fileid: 0,
            mode: meta.mode(),
            nlink: u32::try_from(meta.nlink()).unwrap_or(u32::MAX),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: host_rdev(meta.rdev()),
            size: meta.size(),
            used: meta.blocks() * 512,
            blksize: u32::try_from(meta.blksize()).unwrap_or(4096),
            atime: Timestamp::from_parts(meta.atime(), meta.atime_nsec()),
            mtime: Timestamp::from_parts(meta.mtime(), meta.mtime_nsec()),
            ctime: Timestamp::from_parts(meta.ctime(), meta.ctime_nsec()),
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == FileKind::Directory
    }
}

fn to_nfstime3(time: Timestamp) -> nfs3::nfstime3 {
    nfs3::nfstime3 { seconds: time.seconds, nseconds: time.nseconds }
}

fn to_timeval(time: Timestamp) -> nfs2::timeval {
    nfs2::timeval { seconds: time.seconds, useconds: time.nseconds / 1000 }
}

impl From<&FileAttrs> for nfs3::fattr3 {
    fn from(attr: &FileAttrs) -> Self {
        nfs3::fattr3 {
            ftype: attr.kind().into(),
            mode: attr.mode & MODE_PERM_MASK,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            size: attr.size,
            used: attr.used,
            rdev: nfs3::specdata3 {
                specdata1: rdev_major(attr.rdev),
                specdata2: rdev_minor(attr.rdev),
            },
            fsid: attr.dev,
            fileid: attr.fileid,
            atime: to_nfstime3(attr.atime),
            mtime: to_nfstime3(attr.mtime),
            ctime: to_nfstime3(attr.ctime),
        }
    }
}

/// Version 2 carries the full mode word, format bits included.
impl From<&FileAttrs> for nfs2::fattr {
    fn from(attr: &FileAttrs) -> Self {
        let blocksize = attr.blksize.max(512);
        nfs2::fattr {
            ftype: attr.kind().into(),
            mode: attr.mode,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            size: u32::try_from(attr.size).unwrap_or(u32::MAX),
            blocksize,
            rdev: attr.rdev,
            blocks: u32::try_from(attr.used / 512).unwrap_or(u32::MAX),
            fsid: (attr.dev ^ (attr.dev >> 32)) as u32,
            fileid: (attr.fileid ^ (attr.fileid >> 32)) as u32,
            atime: to_timeval(attr.atime),
            mtime: to_timeval(attr.mtime),
            ctime: to_timeval(attr.ctime),
        }
    }
}

/// How a SETATTR wants a timestamp changed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SetTime {
    #[default]
    DontChange,
    ServerTime,
    ClientTime(Timestamp),
}

/// Version-neutral settable attributes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SetAttrs {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl From<nfs3::set_time> for SetTime {
    fn from(how: nfs3::set_time) -> Self {
        match how {
            nfs3::set_time::DONT_CHANGE => SetTime::DontChange,
            nfs3::set_time::SET_TO_SERVER_TIME => SetTime::ServerTime,
            nfs3::set_time::SET_TO_CLIENT_TIME(t) => {
                SetTime::ClientTime(Timestamp { seconds: t.seconds, nseconds: t.nseconds })
            }
        }
    }
}

impl From<&nfs3::sattr3> for SetAttrs {
    fn from(attr: &nfs3::sattr3) -> Self {
        SetAttrs {
            mode: attr.mode,
            uid: attr.uid,
            gid: attr.gid,
            size: attr.size,
            atime: attr.atime.into(),
            mtime: attr.mtime.into(),
        }
    }
}

fn v2_word(value: u32) -> Option<u32> {
    (value != nfs2::SATTR_UNSET).then_some(value)
}

/// Version 2 clients send `useconds == 1_000_000` to ask for the server clock.
fn v2_time(time: nfs2::timeval) -> SetTime {
    if time.is_unset() {
        SetTime::DontChange
    } else if time.useconds == 1_000_000 {
        SetTime::ServerTime
    } else {
        SetTime::ClientTime(Timestamp {
            seconds: time.seconds,
            nseconds: time.useconds.saturating_mul(1000),
        })
    }
}

impl From<&nfs2::sattr> for SetAttrs {
    fn from(attr: &nfs2::sattr) -> Self {
        SetAttrs {
            mode: v2_word(attr.mode),
            uid: v2_word(attr.uid),
            gid: v2_word(attr.gid),
            size: v2_word(attr.size).map(u64::from),
            atime: v2_time(attr.atime),
            mtime: v2_time(attr.mtime),
        }
    }
}

/// Host permission bits for a requested mode.
///
/// The owner write bit is always kept so the gateway can go on writing the
/// file (and, for directories, the attribute sidecar inside it). Directories
/// also keep owner search permission.
pub fn mode_unmask(mode: u32, is_dir: bool) -> u32 {
    let mut mode = (mode & 0o777) | S_IWUSR;
    if is_dir {
        mode |= S_IXUSR;
    }
    Permissions::from_mode(mode).mode() & 0o777
}

/// Applies the host-representable part of `attrs` to `path`.
///
/// Ownership is never applied to the host; it lives in the attribute store.
pub fn path_setattr(path: &Path, attrs: &SetAttrs, kind: FileKind) -> io::Result<()> {
    if kind != FileKind::Symlink {
        match attrs.atime {
            SetTime::ServerTime => filetime::set_file_atime(path, filetime::FileTime::now())?,
            SetTime::ClientTime(time) => filetime::set_file_atime(path, time.into())?,
            SetTime::DontChange => {}
        }
        match attrs.mtime {
            SetTime::ServerTime => filetime::set_file_mtime(path, filetime::FileTime::now())?,
            SetTime::ClientTime(time) => filetime::set_file_mtime(path, time.into())?,
            SetTime::DontChange => {}
        }
        if let Some(mode) = attrs.mode {
            let host_mode = mode_unmask(mode, kind == FileKind::Directory);
            debug!(" -- set permissions {:?} {:o} (host {:o})", path, mode, host_mode);
            std::fs::set_permissions(path, Permissions::from_mode(host_mode))?;
        }
    }
    if let Some(size) = attrs.size {
        match kind {
            FileKind::Directory => return Err(io::Error::from_raw_os_error(libc::EISDIR)),
            FileKind::Symlink => return Err(io::Error::from_raw_os_error(libc::EINVAL)),
            _ => {}
        }
        debug!(" -- set size {:?} {:?}", path, size);
        OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NOFOLLOW)
            .open(path)?
            .set_len(size)?;
    }
    Ok(())
}

/// Translates a host error into the nearest NFS status, defaulting to `IO`.
pub fn nfsstat_from_io(err: &io::Error) -> nfs3::nfsstat3 {
    use nfs3::nfsstat3::*;
    match err.raw_os_error() {
        Some(libc::ENOENT) => NFS3ERR_NOENT,
        Some(libc::EACCES) => NFS3ERR_ACCES,
        Some(libc::EPERM) => NFS3ERR_PERM,
        Some(libc::EEXIST) => NFS3ERR_EXIST,
        Some(libc::ENOTDIR) => NFS3ERR_NOTDIR,
        Some(libc::EISDIR) => NFS3ERR_ISDIR,
        Some(libc::ENOTEMPTY) => NFS3ERR_NOTEMPTY,
        Some(libc::ENOSPC) => NFS3ERR_NOSPC,
        Some(libc::EROFS) => NFS3ERR_ROFS,
        Some(libc::ENAMETOOLONG) => NFS3ERR_NAMETOOLONG,
        Some(libc::EXDEV) => NFS3ERR_XDEV,
        Some(libc::EINVAL) => NFS3ERR_INVAL,
        Some(libc::EFBIG) => NFS3ERR_FBIG,
        Some(libc::EDQUOT) => NFS3ERR_DQUOT,
        Some(libc::EMLINK) => NFS3ERR_MLINK,
        Some(_) => NFS3ERR_IO,
        None => match err.kind() {
            io::ErrorKind::NotFound => NFS3ERR_NOENT,
            io::ErrorKind::PermissionDenied => NFS3ERR_ACCES,
            io::ErrorKind::AlreadyExists => NFS3ERR_EXIST,
            _ => NFS3ERR_IO,
        },
    }
}

/// Like [`nfsstat_from_io`], for objects reached through a handle the client
/// believes valid: a vanished object is `STALE`, not `NOENT`.
pub fn stale_from_io(err: &io::Error) -> nfs3::nfsstat3 {
    match nfsstat_from_io(err) {
        nfs3::nfsstat3::NFS3ERR_NOENT => nfs3::nfsstat3::NFS3ERR_STALE,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmask_keeps_owner_write() {
        assert_eq!(mode_unmask(0o400, false), 0o600);
        assert_eq!(mode_unmask(0o4755, false), 0o755);
        assert_eq!(mode_unmask(0o500, true), 0o700);
    }

    #[test]
    fn kind_from_format_bits() {
        assert_eq!(FileKind::from_mode(S_IFCHR | 0o666), FileKind::CharDevice);
        assert_eq!(FileKind::from_mode(0o644), FileKind::None);
        assert_eq!(nfs2::ftype::from(FileKind::None), nfs2::ftype::NFNON);
    }

    #[test]
    fn errno_table_falls_back_to_io() {
        let noent = io::Error::from_raw_os_error(libc::ENOENT);
        assert_eq!(nfsstat_from_io(&noent), nfs3::nfsstat3::NFS3ERR_NOENT);
        assert_eq!(stale_from_io(&noent), nfs3::nfsstat3::NFS3ERR_STALE);
        let busy = io::Error::from_raw_os_error(libc::EBUSY);
        assert_eq!(nfsstat_from_io(&busy), nfs3::nfsstat3::NFS3ERR_IO);
    }

    #[test]
    fn v2_sattr_sentinels_are_unset() {
        let mut raw = nfs2::sattr::default();
        raw.mode = 0o400;
        let attrs = SetAttrs::from(&raw);
        assert_eq!(attrs.mode, Some(0o400));
        assert_eq!(attrs.uid, None);
        assert_eq!(attrs.size, None);
        assert_eq!(attrs.mtime, SetTime::DontChange);
    }
}
