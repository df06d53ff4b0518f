//! File handle resolver.
//!
//! Maps canonical export paths to stable 64-bit handle ids and back, owns the
//! attribute shadow stores, and wraps every host file system call so that
//! nothing outside the export root is ever touched.

pub mod attr_db;
pub mod devices;
pub mod handle;
pub mod path;

use std::collections::HashMap;
use std::ffi::{CString, OsStr, OsString};
use std::fs::{File, Metadata, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, MetadataExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::fs_util::{path_setattr, FileAttrs, FileKind, SetAttrs};
pub use attr_db::{AttrRecord, FileAttrDb, SHADOW_FILE_NAME, UNSET};
pub use devices::{DeviceKind, DeviceSpec, DeviceTable};
pub use handle::{handle_id, FileHandle};
pub use path::ExportPath;

#[derive(Debug, Error)]
pub enum FileTableError {
    #[error("cannot open export root {path:?}: {source}")]
    Root { path: PathBuf, source: io::Error },
    #[error("export root {0:?} is not a directory")]
    NotDirectory(PathBuf),
}

/// Host file system statistics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FsStats {
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_free: u64,
    pub blocks_avail: u64,
    pub files: u64,
    pub files_free: u64,
    pub files_avail: u64,
    pub name_max: u64,
}

#[derive(Debug)]
pub struct FileTable {
    /// Canonical host directory of the export.
    root: PathBuf,
    handles: HashMap<u64, ExportPath>,
    paths: HashMap<ExportPath, u64>,
    attrs: FileAttrDb,
    devices: DeviceTable,
}

impl FileTable {
    pub fn new(root: &Path, devices: DeviceTable) -> Result<Self, FileTableError> {
        let canonical = std::fs::canonicalize(root)
            .map_err(|source| FileTableError::Root { path: root.to_path_buf(), source })?;
        if !canonical.is_dir() {
            return Err(FileTableError::NotDirectory(canonical));
        }
        debug!("export root {:?}", canonical);
        Ok(FileTable {
            attrs: FileAttrDb::new(canonical.clone()),
            root: canonical,
            handles: HashMap::new(),
            paths: HashMap::new(),
            devices,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Host path of an export path.
    pub fn host_path(&self, path: &ExportPath) -> PathBuf {
        self.root.join(path.relative())
    }

    /// Canonicalizes an export-relative request path.
    ///
    /// Only the directory part goes through `realpath`, so the leaf need not
    /// exist. A directory part that climbs above the export root is clamped
    /// to the root; one that leaves the export by a symlink is refused.
    pub fn canonicalize(&self, path: &Path) -> io::Result<ExportPath> {
        let (dir, leaf) = path::split_leaf(path);
        let real = std::fs::canonicalize(self.root.join(&dir))?;
        let base = match real.strip_prefix(&self.root) {
            Ok(rel) => ExportPath::from_relative(rel),
            Err(_) if self.root.starts_with(&real) => ExportPath::root(),
            Err(_) => {
                debug!("{:?} resolves outside the export ({:?})", path, real);
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
        };
        Ok(match leaf {
            Some(leaf) => base.join(leaf),
            None => base,
        })
    }

    /// Canonical path of `name` inside `dir`.
    pub fn child(&self, dir: &ExportPath, name: &OsStr) -> io::Result<ExportPath> {
        self.canonicalize(&dir.as_path().join(name))
    }

    /// Returns the handle of an existing object, minting it on first use.
    ///
    /// A path keeps its handle for the server lifetime. If the object's id was
    /// bound to another path (a rename behind our back, or a hard link), the
    /// id is rebound to `path`.
    pub fn get_or_create_handle(&mut self, path: &ExportPath) -> io::Result<FileHandle> {
        let meta = self.metadata(path)?;
        let id = handle_id(meta.dev(), meta.ino());
        if self.paths.get(path) == Some(&id) {
            return Ok(FileHandle::new(id));
        }
        if let Some(old_id) = self.paths.remove(path) {
            if self.handles.get(&old_id) == Some(path) {
                self.handles.remove(&old_id);
            }
        }
        if let Some(old_path) = self.handles.insert(id, path.clone()) {
            debug!("rebinding handle {:x} from {} to {}", id, old_path, path);
            self.paths.remove(&old_path);
        }
        self.paths.insert(path.clone(), id);
        Ok(FileHandle::new(id))
    }

    /// Canonicalizes a request path and returns its handle.
    pub fn handle_for(&mut self, path: &Path) -> io::Result<(ExportPath, FileHandle)> {
        let canonical = self.canonicalize(path)?;
        let handle = self.get_or_create_handle(&canonical)?;
        Ok((canonical, handle))
    }

    /// `None` means the handle is stale.
    pub fn resolve(&self, handle: &FileHandle) -> Option<ExportPath> {
        self.handles.get(&handle.id()).cloned()
    }

    /// Rebinds the handles of `from` and everything below it to `to` after a
    /// host rename, and migrates the shadowed attributes.
    pub fn move_path(&mut self, from: &ExportPath, to: &ExportPath) {
        let replaced: Vec<ExportPath> =
            self.paths.keys().filter(|p| p.is_within(to)).cloned().collect();
        for path in replaced {
            self.unbind(&path);
        }
        let moved: Vec<(ExportPath, u64)> = self
            .paths
            .iter()
            .filter(|(p, _)| p.is_within(from))
            .map(|(p, id)| (p.clone(), *id))
            .collect();
        for (old, _) in &moved {
            self.paths.remove(old);
        }
        for (old, id) in moved {
            if let Some(new) = old.rebase(from, to) {
                debug!("moving handle {:x}: {} -> {}", id, old, new);
                self.handles.insert(id, new.clone());
                self.paths.insert(new, id);
            } else {
                self.handles.remove(&id);
            }
        }
        self.attrs.rename(from, to);
        self.attrs.rebase_dirs(from, to);
    }

    /// Forgets a removed object: its handle and its shadowed attributes.
    pub fn remove_path(&mut self, path: &ExportPath) {
        self.unbind(path);
        self.attrs.remove(path);
        self.attrs.forget_dir(path);
    }

    fn unbind(&mut self, path: &ExportPath) {
        if let Some(id) = self.paths.remove(path) {
            if self.handles.get(&id) == Some(path) {
                self.handles.remove(&id);
            }
        }
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// `lstat` of the host object.
    pub fn metadata(&self, path: &ExportPath) -> io::Result<Metadata> {
        std::fs::symlink_metadata(self.host_path(path))
    }

    /// Client-visible attributes: host `lstat`, then device faking, then the
    /// shadow record.
    pub fn attributes(&mut self, path: &ExportPath) -> io::Result<FileAttrs> {
        let meta = self.metadata(path)?;
        let mut attrs = FileAttrs::from_metadata(&meta);
        attrs.fileid = handle_id(attrs.dev, attrs.ino);
        if let Some(spec) = self.device_spec(path) {
            DeviceTable::apply(spec, &mut attrs);
        }
        if let Some(record) = self.attrs.get(path) {
            record.overlay(&mut attrs);
        }
        Ok(attrs)
    }

    fn device_spec(&self, path: &ExportPath) -> Option<&DeviceSpec> {
        let parent = path.parent()?;
        if parent.file_name()? != OsStr::new("dev") {
            return None;
        }
        self.devices.lookup(path.file_name()?.as_bytes())
    }

    pub fn shadow(&mut self, path: &ExportPath) -> Option<AttrRecord> {
        self.attrs.get(path)
    }

    pub fn set_shadow(&mut self, path: &ExportPath, record: &AttrRecord) {
        self.attrs.set(path, record);
    }

    pub fn flush_attrs(&mut self) -> usize {
        self.attrs.flush_all_dirty()
    }

    pub fn dirty_stores(&self) -> usize {
        self.attrs.dirty_count()
    }

    /// Opens the host object. A symlink leaf is never followed (`ELOOP`).
    pub fn open(&self, path: &ExportPath, options: &OpenOptions) -> io::Result<File> {
        let mut options = options.clone();
        options.custom_flags(libc::O_NOFOLLOW);
        options.open(self.host_path(path))
    }

    pub fn rename(&self, from: &ExportPath, to: &ExportPath) -> io::Result<()> {
        std::fs::rename(self.host_path(from), self.host_path(to))
    }

    pub fn remove_file(&self, path: &ExportPath) -> io::Result<()> {
        std::fs::remove_file(self.host_path(path))
    }

    /// Removes a directory. A directory holding nothing but its sidecar
    /// counts as empty.
    pub fn remove_dir(&self, path: &ExportPath) -> io::Result<()> {
        let host = self.host_path(path);
        let mut only_sidecar = false;
        for entry in std::fs::read_dir(&host)? {
            if attr_db::is_shadow_file(&entry?.file_name()) {
                only_sidecar = true;
            } else {
                return Err(io::Error::from_raw_os_error(libc::ENOTEMPTY));
            }
        }
        if only_sidecar {
            std::fs::remove_file(host.join(SHADOW_FILE_NAME))?;
        }
        std::fs::remove_dir(host)
    }

    pub fn create_dir(&self, path: &ExportPath, mode: u32) -> io::Result<()> {
        std::fs::DirBuilder::new().mode(mode).create(self.host_path(path))
    }

    /// Host entries of a directory sorted by name, without the sidecar.
    pub fn read_dir(&self, path: &ExportPath) -> io::Result<Vec<OsString>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.host_path(path))? {
            let name = entry?.file_name();
            if !attr_db::is_shadow_file(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Creates a symlink at `path`; `target` is stored verbatim.
    pub fn symlink(&self, target: &OsStr, path: &ExportPath) -> io::Result<()> {
        std::os::unix::fs::symlink(target, self.host_path(path))
    }

    pub fn hard_link(&self, existing: &ExportPath, link: &ExportPath) -> io::Result<()> {
        std::fs::hard_link(self.host_path(existing), self.host_path(link))
    }

    pub fn read_link(&self, path: &ExportPath) -> io::Result<PathBuf> {
        std::fs::read_link(self.host_path(path))
    }

    /// Applies mode, size and times to the host object. A host symlink is
    /// treated as one whatever `kind` the client sees.
    pub fn set_host_attrs(
        &self,
        path: &ExportPath,
        attrs: &SetAttrs,
        kind: FileKind,
    ) -> io::Result<()> {
        let kind = match self.metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => FileKind::Symlink,
            _ => kind,
        };
        path_setattr(&self.host_path(path), attrs, kind)
    }

    #[allow(clippy::unnecessary_cast)]
    pub fn statvfs(&self, path: &ExportPath) -> io::Result<FsStats> {
        let host = CString::new(self.host_path(path).as_os_str().as_bytes())
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;
        // SAFETY: `host` is a valid NUL-terminated string and `st` is a
        // properly sized out-parameter.
        let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
        if unsafe { libc::statvfs(host.as_ptr(), &mut st) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(FsStats {
            block_size: st.f_frsize as u64,
            blocks: st.f_blocks as u64,
            blocks_free: st.f_bfree as u64,
            blocks_avail: st.f_bavail as u64,
            files: st.f_files as u64,
            files_free: st.f_ffree as u64,
            files_avail: st.f_favail as u64,
            name_max: st.f_namemax as u64,
        })
    }
}
