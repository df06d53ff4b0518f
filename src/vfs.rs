//! Version-neutral file service shared by the NFSv2 and NFSv3 handlers.
//!
//! [`Vfs`] turns handles into canonical paths through the [`FileTable`],
//! performs the host operation, and keeps the attribute shadow store in step.
//! Every operation reports failure as an `nfsstat3`; version 2 handlers
//! narrow it with `nfsstat::from`.
//!
//! Semantics worth knowing:
//! - a mode change is applied to the host with the owner write bit forced on
//!   (see [`mode_unmask`]) while the exact bits are kept in the shadow store;
//! - ownership is never applied to the host;
//! - READDIR cookies are ordinals into a listing that is rebuilt on every
//!   call: `.`, `..`, then the host entries sorted by name;
//! - unstable writes keep the descriptor open until COMMIT, for at most
//!   [`MAX_OPEN_WRITES`] files at a time;
//! - a symlink leaf is never followed when data is read or written.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::{FileExt, MetadataExt, OpenOptionsExt};
use std::time::{SystemTime, UNIX_EPOCH};

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::filetable::{
    handle_id, AttrRecord, ExportPath, FileHandle, FileTable, FsStats, SHADOW_FILE_NAME, UNSET,
};
use crate::fs_util::{
    mode_unmask, nfsstat_from_io, stale_from_io, FileAttrs, FileKind, SetAttrs, SetTime,
    Timestamp, MODE_PERM_MASK, S_IFMT,
};
use crate::protocol::xdr::nfs3::file::stable_how;
use crate::protocol::xdr::nfs3::{self, nfsstat3};

pub type VfsResult<T> = Result<T, nfsstat3>;

/// Entries returned per READDIR call.
pub const READDIR_BATCH: usize = 10;

/// Longest name accepted in a directory operation.
pub const NAME_MAX: usize = 255;

/// Mode given to regular files created without one.
const DEFAULT_FILE_MODE: u32 = 0o644;
const DEFAULT_DIR_MODE: u32 = 0o755;

/// Unstable write descriptors kept open at once; beyond this the least
/// recently written one is synced and closed.
pub const MAX_OPEN_WRITES: usize = 64;

/// Cookie verifier; ordinals do not depend on server state.
pub const COOKIE_VERIFIER: nfs3::cookieverf3 = [0; 8];

/// Ownership taken from AUTH_UNIX credentials.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

/// How CREATE treats an existing file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CreateMode {
    /// Reuse it and apply the attributes.
    Unchecked,
    /// Fail with `EXIST`.
    Guarded,
    /// Fail with `EXIST`; the verifier is not persisted.
    Exclusive,
}

/// Type bits and device number for objects the host cannot create (device
/// nodes, FIFOs, sockets). They are backed by an empty regular file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpecialNode {
    pub format: u32,
    pub rdev: u32,
}

#[derive(Clone, Debug)]
pub struct DirEntry {
    pub name: Vec<u8>,
    /// Ordinal of the entry after this one.
    pub cookie: u64,
    pub fileid: u64,
    /// Filled for READDIRPLUS.
    pub handle: Option<FileHandle>,
    pub attrs: Option<FileAttrs>,
}

#[derive(Clone, Debug, Default)]
pub struct ReadDirResult {
    pub entries: SmallVec<[DirEntry; READDIR_BATCH]>,
    pub eof: bool,
}

#[derive(Clone, Debug)]
pub struct ReadResult {
    pub data: Vec<u8>,
    pub eof: bool,
    pub attrs: FileAttrs,
}

#[derive(Copy, Clone, Debug)]
pub struct WriteResult {
    pub count: u32,
    pub committed: stable_how,
    pub attrs: FileAttrs,
}

/// Attributes around a mutation, for weak cache consistency replies.
#[derive(Copy, Clone, Debug, Default)]
pub struct Wcc {
    pub before: Option<FileAttrs>,
    pub after: Option<FileAttrs>,
}

impl Wcc {
    pub fn to_v3(&self) -> nfs3::wcc_data {
        nfs3::wcc_data {
            before: self.before.as_ref().map(|a| nfs3::wcc_attr::from(&nfs3::fattr3::from(a))),
            after: self.after.as_ref().map(nfs3::fattr3::from),
        }
    }
}

#[derive(Debug)]
struct OpenWrite {
    file: File,
    last_write: u64,
}

/// The export as seen by the procedures.
#[derive(Debug)]
pub struct Vfs {
    files: FileTable,
    /// Descriptors kept open by unstable writes, keyed by handle id.
    writes: HashMap<u64, OpenWrite>,
    write_seq: u64,
    read_only: bool,
    write_verifier: nfs3::writeverf3,
}

fn check_name(name: &[u8]) -> VfsResult<&OsStr> {
    if name.is_empty() {
        return Err(nfsstat3::NFS3ERR_NOENT);
    }
    if name.len() > NAME_MAX {
        return Err(nfsstat3::NFS3ERR_NAMETOOLONG);
    }
    if name.contains(&b'/') || name.contains(&0) {
        return Err(nfsstat3::NFS3ERR_ACCES);
    }
    Ok(OsStr::from_bytes(name))
}

/// Names a client may create or remove: no dot entries and never the sidecar.
fn check_new_name(name: &[u8]) -> VfsResult<&OsStr> {
    let name = check_name(name)?;
    if name == "." || name == ".." {
        return Err(nfsstat3::NFS3ERR_EXIST);
    }
    if name == SHADOW_FILE_NAME {
        return Err(nfsstat3::NFS3ERR_ACCES);
    }
    Ok(name)
}

fn time_parts(time: Timestamp) -> (u32, u32) {
    (time.seconds, time.nseconds / 1000)
}

fn now() -> Timestamp {
    let since = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    Timestamp { seconds: since.as_secs() as u32, nseconds: since.subsec_nanos() }
}

impl Vfs {
    pub fn new(files: FileTable, read_only: bool) -> Self {
        let boot = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        let write_verifier = (boot.as_nanos() as u64).to_be_bytes();
        Vfs { files, writes: HashMap::new(), write_seq: 0, read_only, write_verifier }
    }

    pub fn files(&self) -> &FileTable {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut FileTable {
        &mut self.files
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Changes on every server start so clients can detect lost unstable
    /// writes.
    pub fn write_verifier(&self) -> nfs3::writeverf3 {
        self.write_verifier
    }

    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(nfsstat3::NFS3ERR_ROFS)
        } else {
            Ok(())
        }
    }

    pub fn root_handle(&mut self) -> VfsResult<FileHandle> {
        self.files.get_or_create_handle(&ExportPath::root()).map_err(|e| nfsstat_from_io(&e))
    }

    /// Handle of a directory named by an export-relative path (MNT).
    pub fn directory_handle(&mut self, path: &[u8]) -> VfsResult<FileHandle> {
        let (canonical, handle) = self
            .files
            .handle_for(std::path::Path::new(OsStr::from_bytes(path)))
            .map_err(|e| nfsstat_from_io(&e))?;
        if !self.attributes(&canonical)?.is_dir() {
            return Err(nfsstat3::NFS3ERR_NOTDIR);
        }
        Ok(handle)
    }

    pub fn resolve(&self, handle: &FileHandle) -> VfsResult<ExportPath> {
        self.files.resolve(handle).ok_or(nfsstat3::NFS3ERR_STALE)
    }

    fn attributes(&mut self, path: &ExportPath) -> VfsResult<FileAttrs> {
        self.files.attributes(path).map_err(|e| stale_from_io(&e))
    }

    fn resolve_dir(&mut self, handle: &FileHandle) -> VfsResult<(ExportPath, FileAttrs)> {
        let path = self.resolve(handle)?;
        let attrs = self.attributes(&path)?;
        if !attrs.is_dir() {
            return Err(nfsstat3::NFS3ERR_NOTDIR);
        }
        Ok((path, attrs))
    }

    /// Best-effort attributes for `post_op_attr` style replies.
    pub fn try_getattr(&mut self, handle: &FileHandle) -> Option<FileAttrs> {
        let path = self.files.resolve(handle)?;
        self.files.attributes(&path).ok()
    }

    pub fn getattr(&mut self, handle: &FileHandle) -> VfsResult<FileAttrs> {
        let path = self.resolve(handle)?;
        self.attributes(&path)
    }

    /// Applies `attrs` to an object. With `guard`, the object's ctime must
    /// still match (`NOT_SYNC` otherwise).
    pub fn setattr(
        &mut self,
        handle: &FileHandle,
        attrs: &SetAttrs,
        guard: Option<Timestamp>,
    ) -> VfsResult<Wcc> {
        let path = self.resolve(handle)?;
        let before = self.attributes(&path)?;
        if let Some(ctime) = guard {
            if ctime != before.ctime {
                return Err(nfsstat3::NFS3ERR_NOT_SYNC);
            }
        }
        self.check_writable()?;
        self.apply_attrs(&path, &before, attrs)?;
        let after = self.attributes(&path).ok();
        Ok(Wcc { before: Some(before), after })
    }

    fn apply_attrs(
        &mut self,
        path: &ExportPath,
        current: &FileAttrs,
        attrs: &SetAttrs,
    ) -> VfsResult<()> {
        let kind = current.kind();
        if attrs.size.is_some() && kind == FileKind::Directory {
            return Err(nfsstat3::NFS3ERR_ISDIR);
        }
        self.files.set_host_attrs(path, attrs, kind).map_err(|e| stale_from_io(&e))?;

        let mut record = AttrRecord::default();
        if let Some(mode) = attrs.mode {
            // Keep type bits the record already fakes.
            let tracked_format = match self.files.shadow(path) {
                Some(old) if old.mode != UNSET => old.mode & S_IFMT,
                _ => 0,
            };
            record.mode = tracked_format | (mode & MODE_PERM_MASK);
        }
        record.uid = attrs.uid.unwrap_or(UNSET);
        record.gid = attrs.gid.unwrap_or(UNSET);
        if kind == FileKind::Symlink {
            // The host cannot set symlink times without following the link.
            if let Some(t) = shadow_time(attrs.atime) {
                (record.atime_sec, record.atime_usec) = time_parts(t);
            }
            if let Some(t) = shadow_time(attrs.mtime) {
                (record.mtime_sec, record.mtime_usec) = time_parts(t);
            }
        }
        self.files.set_shadow(path, &record);
        Ok(())
    }

    /// Looks `name` up in a directory. `.` and `..` are honoured; `..` of
    /// the root is the root.
    pub fn lookup(&mut self, dir: &FileHandle, name: &[u8]) -> VfsResult<(FileHandle, FileAttrs)> {
        let (dir_path, _) = self.resolve_dir(dir)?;
        let name = check_name(name)?;
        if name == SHADOW_FILE_NAME {
            return Err(nfsstat3::NFS3ERR_NOENT);
        }
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        let handle = self.files.get_or_create_handle(&path).map_err(|e| nfsstat_from_io(&e))?;
        let attrs = self.files.attributes(&path).map_err(|e| nfsstat_from_io(&e))?;
        Ok((handle, attrs))
    }

    pub fn read(&mut self, handle: &FileHandle, offset: u64, count: u32) -> VfsResult<ReadResult> {
        let path = self.resolve(handle)?;
        self.check_data_file(&path)?;
        let mut data = vec![0u8; count as usize];
        let mut filled = 0;
        {
            let opened;
            let file = match self.writes.get(&handle.id()) {
                Some(open) => &open.file,
                None => {
                    opened = self
                        .files
                        .open(&path, OpenOptions::new().read(true))
                        .map_err(|e| stale_from_io(&e))?;
                    &opened
                }
            };
            while filled < data.len() {
                match file.read_at(&mut data[filled..], offset + filled as u64) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(nfsstat_from_io(&e)),
                }
            }
        }
        data.truncate(filled);
        let attrs = self.attributes(&path)?;
        let eof = offset + filled as u64 >= attrs.size;
        Ok(ReadResult { data, eof, attrs })
    }

    /// Data is only moved through regular host files; faked device nodes are
    /// backed by one, symlinks are never followed.
    fn check_data_file(&self, path: &ExportPath) -> VfsResult<()> {
        let meta = self.files.metadata(path).map_err(|e| stale_from_io(&e))?;
        if meta.is_dir() {
            Err(nfsstat3::NFS3ERR_ISDIR)
        } else if !meta.is_file() {
            Err(nfsstat3::NFS3ERR_INVAL)
        } else {
            Ok(())
        }
    }

    /// Writes `data` at `offset`. Anything but `UNSTABLE` is synced and the
    /// descriptor closed before returning.
    pub fn write(
        &mut self,
        handle: &FileHandle,
        offset: u64,
        data: &[u8],
        stable: stable_how,
    ) -> VfsResult<WriteResult> {
        self.check_writable()?;
        let path = self.resolve(handle)?;
        self.check_data_file(&path)?;
        let file = match self.writes.remove(&handle.id()) {
            Some(open) => open.file,
            None => self
                .files
                .open(&path, OpenOptions::new().read(true).write(true))
                .map_err(|e| stale_from_io(&e))?,
        };
        file.write_all_at(data, offset).map_err(|e| nfsstat_from_io(&e))?;
        let committed = match stable {
            stable_how::UNSTABLE => {
                self.keep_open(handle.id(), file);
                stable_how::UNSTABLE
            }
            _ => {
                file.sync_all().map_err(|e| nfsstat_from_io(&e))?;
                stable_how::FILE_SYNC
            }
        };
        let attrs = self.attributes(&path)?;
        Ok(WriteResult { count: data.len() as u32, committed, attrs })
    }

    /// Flushes and closes the descriptor of earlier unstable writes.
    pub fn commit(&mut self, handle: &FileHandle) -> VfsResult<FileAttrs> {
        let path = self.resolve(handle)?;
        if let Some(open) = self.writes.remove(&handle.id()) {
            open.file.sync_all().map_err(|e| nfsstat_from_io(&e))?;
            debug!("committed {}", path);
        }
        self.attributes(&path)
    }

    /// Closes every cached descriptor.
    pub fn close_all(&mut self) {
        for (id, open) in self.writes.drain() {
            if let Err(e) = open.file.sync_all() {
                warn!("sync of {:x} failed: {}", id, e);
            }
        }
    }

    fn keep_open(&mut self, id: u64, file: File) {
        if self.writes.len() >= MAX_OPEN_WRITES {
            let oldest = self.writes.iter().min_by_key(|(_, open)| open.last_write);
            if let Some(oldest) = oldest.map(|(id, _)| *id) {
                if let Some(open) = self.writes.remove(&oldest) {
                    debug!("evicting unstable descriptor {:x}", oldest);
                    if let Err(e) = open.file.sync_all() {
                        warn!("sync of {:x} failed: {}", oldest, e);
                    }
                }
            }
        }
        self.write_seq += 1;
        self.writes.insert(id, OpenWrite { file, last_write: self.write_seq });
    }

    pub fn open_writes(&self) -> usize {
        self.writes.len()
    }

    fn new_object(
        &mut self,
        path: &ExportPath,
        record: AttrRecord,
    ) -> VfsResult<(FileHandle, FileAttrs)> {
        self.files.set_shadow(path, &record);
        let handle = self.files.get_or_create_handle(path).map_err(|e| nfsstat_from_io(&e))?;
        let attrs = self.attributes(path)?;
        Ok((handle, attrs))
    }

    fn ownership(record: &mut AttrRecord, attrs: &SetAttrs, owner: Option<Owner>) {
        record.uid = attrs.uid.or(owner.map(|o| o.uid)).unwrap_or(UNSET);
        record.gid = attrs.gid.or(owner.map(|o| o.gid)).unwrap_or(UNSET);
    }

    /// Creates a regular file (or the backing file of a [`SpecialNode`]).
    pub fn create(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        how: CreateMode,
        attrs: &SetAttrs,
        special: Option<SpecialNode>,
        owner: Option<Owner>,
    ) -> VfsResult<(FileHandle, FileAttrs, Wcc)> {
        self.check_writable()?;
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        let mode = attrs.mode.unwrap_or(DEFAULT_FILE_MODE);

        let mut options = OpenOptions::new();
        options.write(true).mode(mode_unmask(mode, false));
        match how {
            CreateMode::Unchecked => options.create(true),
            CreateMode::Guarded | CreateMode::Exclusive => options.create_new(true),
        };
        let existing = self.files.metadata(&path).ok();
        if existing.as_ref().is_some_and(|m| !m.is_file()) {
            return Err(nfsstat3::NFS3ERR_EXIST);
        }
        let existed = existing.is_some();
        drop(self.files.open(&path, &options).map_err(|e| nfsstat_from_io(&e))?);
        debug!("created {} (mode {:o}, existed {})", path, mode, existed);

        let host_attrs = SetAttrs { mode: None, uid: None, gid: None, ..*attrs };
        if existed {
            let current = self.attributes(&path)?;
            self.apply_attrs(&path, &current, attrs)?;
        } else if host_attrs != SetAttrs::default() {
            self.files
                .set_host_attrs(&path, &host_attrs, FileKind::Regular)
                .map_err(|e| nfsstat_from_io(&e))?;
        }

        let mut record = AttrRecord::default();
        if !existed {
            Self::ownership(&mut record, attrs, owner);
            if let Some(mode) = attrs.mode {
                record.mode = mode & MODE_PERM_MASK;
            }
        }
        if let Some(node) = special {
            record.mode = (node.format & S_IFMT) | (mode & MODE_PERM_MASK);
            record.rdev = node.rdev;
        }
        let (handle, file_attrs) = self.new_object(&path, record)?;
        let wcc = Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() };
        Ok((handle, file_attrs, wcc))
    }

    pub fn mkdir(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        attrs: &SetAttrs,
        owner: Option<Owner>,
    ) -> VfsResult<(FileHandle, FileAttrs, Wcc)> {
        self.check_writable()?;
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        let mode = attrs.mode.unwrap_or(DEFAULT_DIR_MODE);
        self.files
            .create_dir(&path, mode_unmask(mode, true))
            .map_err(|e| nfsstat_from_io(&e))?;
        debug!("mkdir {} (mode {:o})", path, mode);

        let mut record = AttrRecord::default();
        Self::ownership(&mut record, attrs, owner);
        if let Some(mode) = attrs.mode {
            record.mode = mode & MODE_PERM_MASK;
        }
        let (handle, dir_attrs) = self.new_object(&path, record)?;
        let wcc = Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() };
        Ok((handle, dir_attrs, wcc))
    }

    pub fn symlink(
        &mut self,
        dir: &FileHandle,
        name: &[u8],
        target: &[u8],
        attrs: &SetAttrs,
        owner: Option<Owner>,
    ) -> VfsResult<(FileHandle, FileAttrs, Wcc)> {
        self.check_writable()?;
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        if target.is_empty() || target.contains(&0) {
            return Err(nfsstat3::NFS3ERR_INVAL);
        }
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        self.files
            .symlink(OsStr::from_bytes(target), &path)
            .map_err(|e| nfsstat_from_io(&e))?;
        debug!("symlink {} -> {:?}", path, String::from_utf8_lossy(target));

        let mut record = AttrRecord::default();
        Self::ownership(&mut record, attrs, owner);
        if let Some(mode) = attrs.mode {
            record.mode = mode & MODE_PERM_MASK;
        }
        let (handle, link_attrs) = self.new_object(&path, record)?;
        let wcc = Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() };
        Ok((handle, link_attrs, wcc))
    }

    pub fn readlink(&mut self, handle: &FileHandle) -> VfsResult<(Vec<u8>, FileAttrs)> {
        let path = self.resolve(handle)?;
        let attrs = self.attributes(&path)?;
        if attrs.kind() != FileKind::Symlink {
            return Err(nfsstat3::NFS3ERR_INVAL);
        }
        let target = self.files.read_link(&path).map_err(|e| stale_from_io(&e))?;
        Ok((target.into_os_string().into_vec(), attrs))
    }

    /// Removes a non-directory entry.
    pub fn remove(&mut self, dir: &FileHandle, name: &[u8]) -> VfsResult<Wcc> {
        self.check_writable()?;
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        let meta = self.files.metadata(&path).map_err(|e| nfsstat_from_io(&e))?;
        if meta.is_dir() {
            return Err(nfsstat3::NFS3ERR_ISDIR);
        }
        self.files.remove_file(&path).map_err(|e| nfsstat_from_io(&e))?;
        self.writes.remove(&handle_id(meta.dev(), meta.ino()));
        self.files.remove_path(&path);
        debug!("removed {}", path);
        Ok(Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() })
    }

    pub fn rmdir(&mut self, dir: &FileHandle, name: &[u8]) -> VfsResult<Wcc> {
        self.check_writable()?;
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        let meta = self.files.metadata(&path).map_err(|e| nfsstat_from_io(&e))?;
        if !meta.is_dir() {
            return Err(nfsstat3::NFS3ERR_NOTDIR);
        }
        self.files.remove_dir(&path).map_err(|e| nfsstat_from_io(&e))?;
        self.files.remove_path(&path);
        debug!("removed directory {}", path);
        Ok(Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() })
    }

    /// Renames an entry; the moved object keeps its handle.
    pub fn rename(
        &mut self,
        from_dir: &FileHandle,
        from_name: &[u8],
        to_dir: &FileHandle,
        to_name: &[u8],
    ) -> VfsResult<(Wcc, Wcc)> {
        self.check_writable()?;
        let (from_dir_path, from_before) = self.resolve_dir(from_dir)?;
        let (to_dir_path, to_before) = self.resolve_dir(to_dir)?;
        let from_name = check_new_name(from_name)?;
        let to_name = check_new_name(to_name)?;
        let from = self.files.child(&from_dir_path, from_name).map_err(|e| nfsstat_from_io(&e))?;
        let to = self.files.child(&to_dir_path, to_name).map_err(|e| nfsstat_from_io(&e))?;
        self.files.metadata(&from).map_err(|e| nfsstat_from_io(&e))?;
        if from != to {
            if to.is_within(&from) {
                return Err(nfsstat3::NFS3ERR_INVAL);
            }
            self.files.rename(&from, &to).map_err(|e| nfsstat_from_io(&e))?;
            self.files.move_path(&from, &to);
            debug!("renamed {} -> {}", from, to);
        }
        let from_wcc =
            Wcc { before: Some(from_before), after: self.attributes(&from_dir_path).ok() };
        let to_wcc = Wcc { before: Some(to_before), after: self.attributes(&to_dir_path).ok() };
        Ok((from_wcc, to_wcc))
    }

    /// Creates a hard link `name` in `dir` to the object behind `file`.
    ///
    /// The link shares the object's handle id; no handle is bound to the new
    /// name until it is looked up.
    pub fn link(
        &mut self,
        file: &FileHandle,
        dir: &FileHandle,
        name: &[u8],
    ) -> VfsResult<(FileAttrs, Wcc)> {
        self.check_writable()?;
        let target = self.resolve(file)?;
        let target_attrs = self.attributes(&target)?;
        if target_attrs.is_dir() {
            return Err(nfsstat3::NFS3ERR_ISDIR);
        }
        let (dir_path, dir_before) = self.resolve_dir(dir)?;
        let name = check_new_name(name)?;
        let path = self.files.child(&dir_path, name).map_err(|e| nfsstat_from_io(&e))?;
        self.files.hard_link(&target, &path).map_err(|e| nfsstat_from_io(&e))?;
        if let Some(record) = self.files.shadow(&target) {
            self.files.set_shadow(&path, &record);
        }
        debug!("linked {} -> {}", path, target);
        let attrs = self.attributes(&target)?;
        Ok((attrs, Wcc { before: Some(dir_before), after: self.attributes(&dir_path).ok() }))
    }

    /// Returns the batch of entries that follows ordinal `cookie`.
    ///
    /// With `plus`, each entry also carries its handle and attributes.
    pub fn readdir(
        &mut self,
        dir: &FileHandle,
        cookie: u64,
        plus: bool,
    ) -> VfsResult<ReadDirResult> {
        let (dir_path, dir_attrs) = self.resolve_dir(dir)?;
        let names = self.files.read_dir(&dir_path).map_err(|e| stale_from_io(&e))?;
        let total = names.len() as u64 + 2;
        let mut result = ReadDirResult::default();
        let mut ordinal = cookie;
        while ordinal < total && result.entries.len() < READDIR_BATCH {
            let index = ordinal;
            ordinal += 1;
            let (name, path) = match index {
                0 => (b".".to_vec(), dir_path.clone()),
                1 => (b"..".to_vec(), dir_path.parent().unwrap_or_else(ExportPath::root)),
                n => {
                    let name = &names[(n - 2) as usize];
                    (name.as_bytes().to_vec(), dir_path.join(name))
                }
            };
            let attrs = if index == 0 {
                dir_attrs
            } else {
                match self.files.attributes(&path) {
                    Ok(attrs) => attrs,
                    Err(e) => {
                        // Vanished since the listing was taken.
                        trace!("skipping {}: {}", path, e);
                        continue;
                    }
                }
            };
            let handle = if plus { self.files.get_or_create_handle(&path).ok() } else { None };
            trace!("readdir {} entry {} {:?}", dir_path, index, String::from_utf8_lossy(&name));
            result.entries.push(DirEntry {
                name,
                cookie: ordinal,
                fileid: attrs.fileid,
                handle,
                attrs: plus.then_some(attrs),
            });
        }
        result.eof = ordinal >= total;
        Ok(result)
    }

    pub fn statfs(&mut self, handle: &FileHandle) -> VfsResult<(FsStats, FileAttrs)> {
        let path = self.resolve(handle)?;
        let attrs = self.attributes(&path)?;
        let stats = self.files.statvfs(&path).map_err(|e| stale_from_io(&e))?;
        Ok((stats, attrs))
    }

    /// Rights the server grants on an object, restricted to `requested`.
    pub fn access(&mut self, handle: &FileHandle, requested: u32) -> VfsResult<(u32, FileAttrs)> {
        let attrs = self.getattr(handle)?;
        let mut granted = match attrs.kind() {
            FileKind::Directory => {
                nfs3::ACCESS3_READ
                    | nfs3::ACCESS3_LOOKUP
                    | nfs3::ACCESS3_MODIFY
                    | nfs3::ACCESS3_EXTEND
                    | nfs3::ACCESS3_DELETE
                    | nfs3::ACCESS3_EXECUTE
            }
            FileKind::Symlink => nfs3::ACCESS3_READ,
            _ => {
                nfs3::ACCESS3_READ
                    | nfs3::ACCESS3_MODIFY
                    | nfs3::ACCESS3_EXTEND
                    | nfs3::ACCESS3_DELETE
                    | nfs3::ACCESS3_EXECUTE
            }
        };
        if self.read_only {
            granted &= !(nfs3::ACCESS3_MODIFY | nfs3::ACCESS3_EXTEND | nfs3::ACCESS3_DELETE);
        }
        Ok((granted & requested, attrs))
    }

    /// Persists dirty attribute stores.
    pub fn flush_attrs(&mut self) -> usize {
        self.files.flush_attrs()
    }

    /// Closes cached descriptors and flushes every store.
    pub fn shutdown(&mut self) -> usize {
        self.close_all();
        self.flush_attrs()
    }
}

fn shadow_time(how: SetTime) -> Option<Timestamp> {
    match how {
        SetTime::DontChange => None,
        SetTime::ServerTime => Some(now()),
        SetTime::ClientTime(time) => Some(time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_checked() {
        assert_eq!(check_name(b""), Err(nfsstat3::NFS3ERR_NOENT));
        assert_eq!(check_name(&[b'a'; 256]), Err(nfsstat3::NFS3ERR_NAMETOOLONG));
        assert_eq!(check_name(b"a/b"), Err(nfsstat3::NFS3ERR_ACCES));
        assert!(check_name(b"..").is_ok());
        assert_eq!(check_new_name(b".."), Err(nfsstat3::NFS3ERR_EXIST));
        assert_eq!(check_new_name(SHADOW_FILE_NAME.as_bytes()), Err(nfsstat3::NFS3ERR_ACCES));
    }
}
