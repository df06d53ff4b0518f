//! Per-directory shadow store for the Unix metadata the host file system
//! cannot hold: exact permission bits, file type bits, ownership and device
//! numbers.
//!
//! Each directory carries a sidecar file named [`SHADOW_FILE_NAME`] with one
//! line per tracked entry:
//!
//! ```text
//! 0<octal mode>:<uid>:<gid>:<rdev>:<name>\n
//! ```
//!
//! Any numeric field equal to [`UNSET`] means "use the host value".

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use super::path::ExportPath;
use crate::fs_util::{FileAttrs, Timestamp, MODE_PERM_MASK, S_IFMT};

/// Reserved file name of the sidecar; never listed to clients.
pub const SHADOW_FILE_NAME: &str = ".nfsd_fattrs";

/// Sentinel for "field not tracked".
pub const UNSET: u32 = 0xFFFF_FFFF;

/// Shadowed attributes of one directory entry.
///
/// Only `mode`, `uid`, `gid` and `rdev` are persisted. Size and timestamps are
/// kept for the lifetime of the process; they are used for objects whose host
/// counterpart cannot carry them (symlink times).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AttrRecord {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub size: u32,
    pub atime_sec: u32,
    pub atime_usec: u32,
    pub mtime_sec: u32,
    pub mtime_usec: u32,
}

impl Default for AttrRecord {
    fn default() -> Self {
        AttrRecord {
            mode: UNSET,
            uid: UNSET,
            gid: UNSET,
            rdev: UNSET,
            size: UNSET,
            atime_sec: UNSET,
            atime_usec: UNSET,
            mtime_sec: UNSET,
            mtime_usec: UNSET,
        }
    }
}

fn merge_field(dst: &mut u32, src: u32) {
    if src != UNSET {
        *dst = src;
    }
}

impl AttrRecord {
    pub fn with_mode(mode: u32) -> Self {
        AttrRecord { mode, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == AttrRecord::default()
    }

    fn is_persistent(&self) -> bool {
        self.mode != UNSET || self.uid != UNSET || self.gid != UNSET || self.rdev != UNSET
    }

    /// Field-wise merge: every set field of `other` replaces ours.
    pub fn merge(&mut self, other: &AttrRecord) {
        merge_field(&mut self.mode, other.mode);
        merge_field(&mut self.uid, other.uid);
        merge_field(&mut self.gid, other.gid);
        merge_field(&mut self.rdev, other.rdev);
        merge_field(&mut self.size, other.size);
        merge_field(&mut self.atime_sec, other.atime_sec);
        merge_field(&mut self.atime_usec, other.atime_usec);
        merge_field(&mut self.mtime_sec, other.mtime_sec);
        merge_field(&mut self.mtime_usec, other.mtime_usec);
    }

    /// Applies the set fields on top of live host attributes.
    ///
    /// For `mode` only the permission bits are replaced, plus the format bits
    /// when the record carries any.
    pub fn overlay(&self, attrs: &mut FileAttrs) {
        if self.mode != UNSET {
            let mut mask = MODE_PERM_MASK;
            if self.mode & S_IFMT != 0 {
                mask |= S_IFMT;
            }
            attrs.mode = (attrs.mode & !mask) | (self.mode & mask);
        }
        if self.uid != UNSET {
            attrs.uid = self.uid;
        }
        if self.gid != UNSET {
            attrs.gid = self.gid;
        }
        if self.rdev != UNSET {
            attrs.rdev = self.rdev;
        }
        if self.size != UNSET {
            attrs.size = u64::from(self.size);
        }
        if self.atime_sec != UNSET {
            attrs.atime = shadow_time(self.atime_sec, self.atime_usec);
        }
        if self.mtime_sec != UNSET {
            attrs.mtime = shadow_time(self.mtime_sec, self.mtime_usec);
        }
    }

    /// Encodes the persistent part as one sidecar line.
    pub fn to_line(&self, name: &[u8]) -> Option<Vec<u8>> {
        if !self.is_persistent() || !valid_entry_name(name) {
            return None;
        }
        let mut line =
            format!("0{:o}:{}:{}:{}:", self.mode, self.uid, self.gid, self.rdev).into_bytes();
        line.extend_from_slice(name);
        line.push(b'\n');
        Some(line)
    }

    /// Parses one sidecar line (without its newline).
    pub fn parse_line(line: &[u8]) -> Option<(Vec<u8>, AttrRecord)> {
        let mut fields = line.splitn(5, |b| *b == b':');
        let mode = fields.next()?;
        let uid = fields.next()?;
        let gid = fields.next()?;
        let rdev = fields.next()?;
        let name = fields.next()?;
        if mode.first() != Some(&b'0') || !valid_entry_name(name) {
            return None;
        }
        let record = AttrRecord {
            mode: parse_number(mode, 8)?,
            uid: parse_number(uid, 10)?,
            gid: parse_number(gid, 10)?,
            rdev: parse_number(rdev, 10)?,
            ..Default::default()
        };
        Some((name.to_vec(), record))
    }
}

fn shadow_time(seconds: u32, useconds: u32) -> Timestamp {
    let useconds = if useconds == UNSET { 0 } else { useconds };
    Timestamp { seconds, nseconds: useconds.saturating_mul(1000) }
}

fn parse_number(field: &[u8], radix: u32) -> Option<u32> {
    let text = std::str::from_utf8(field).ok()?;
    u32::from_str_radix(text, radix).ok()
}

fn valid_entry_name(name: &[u8]) -> bool {
    !name.is_empty()
        && name != b"."
        && name != b".."
        && !name.contains(&b'\n')
        && !name.contains(&b'/')
}

/// Parsed sidecar of one directory.
#[derive(Clone, Debug, Default)]
pub struct DirAttrs {
    entries: BTreeMap<Vec<u8>, AttrRecord>,
}

impl DirAttrs {
    /// Parses sidecar contents; malformed lines and a trailing line without
    /// newline are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let mut entries = BTreeMap::new();
        let mut lines: Vec<&[u8]> = data.split(|b| *b == b'\n').collect();
        // Whatever follows the last newline is either empty or truncated.
        lines.pop();
        for line in lines {
            match AttrRecord::parse_line(line) {
                Some((name, record)) => {
                    entries.insert(name, record);
                }
                None => {
                    trace!("skipping malformed attribute line {:?}", String::from_utf8_lossy(line))
                }
            }
        }
        DirAttrs { entries }
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.entries
            .iter()
            .filter_map(|(name, record)| record.to_line(name))
            .flatten()
            .collect()
    }

    pub fn get(&self, name: &[u8]) -> Option<&AttrRecord> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All shadow stores of one export, loaded lazily and cached per directory.
#[derive(Debug)]
pub struct FileAttrDb {
    root: PathBuf,
    stores: HashMap<ExportPath, DirAttrs>,
    dirty: BTreeSet<ExportPath>,
}

fn split_entry(path: &ExportPath) -> Option<(ExportPath, &[u8])> {
    let parent = path.parent()?;
    let name = path.file_name()?;
    Some((parent, name.as_bytes()))
}

impl FileAttrDb {
    /// `root` is the canonical host directory of the export.
    pub fn new(root: PathBuf) -> Self {
        FileAttrDb { root, stores: HashMap::new(), dirty: BTreeSet::new() }
    }

    fn sidecar_path(&self, dir: &ExportPath) -> PathBuf {
        self.root.join(dir.relative()).join(SHADOW_FILE_NAME)
    }

    fn store(&mut self, dir: &ExportPath) -> &mut DirAttrs {
        if !self.stores.contains_key(dir) {
            let loaded = load_sidecar(&self.sidecar_path(dir));
            self.stores.insert(dir.clone(), loaded);
        }
        self.stores.entry(dir.clone()).or_default()
    }

    /// Record for `path`; the export root itself is never shadowed.
    pub fn get(&mut self, path: &ExportPath) -> Option<AttrRecord> {
        let (dir, name) = split_entry(path)?;
        self.store(&dir).get(name).copied()
    }

    /// Merges `record` into the entry for `path`.
    pub fn set(&mut self, path: &ExportPath, record: &AttrRecord) {
        let Some((dir, name)) = split_entry(path) else {
            debug!("not shadowing attributes of the export root");
            return;
        };
        if record.is_empty() {
            return;
        }
        let store = self.store(&dir);
        store.entries.entry(name.to_vec()).or_default().merge(record);
        self.dirty.insert(dir);
    }

    pub fn remove(&mut self, path: &ExportPath) {
        let Some((dir, name)) = split_entry(path) else {
            return;
        };
        if self.store(&dir).entries.remove(name).is_some() {
            self.dirty.insert(dir);
        }
    }

    /// Moves the record of `from` to `to`, replacing whatever `to` had.
    pub fn rename(&mut self, from: &ExportPath, to: &ExportPath) {
        let (Some((from_dir, from_name)), Some((to_dir, to_name))) =
            (split_entry(from), split_entry(to))
        else {
            return;
        };
        let record = self.store(&from_dir).entries.remove(from_name);
        if record.is_some() {
            self.dirty.insert(from_dir);
        }
        let to_store = self.store(&to_dir);
        let changed = match record {
            Some(record) => {
                to_store.entries.insert(to_name.to_vec(), record);
                true
            }
            None => to_store.entries.remove(to_name).is_some(),
        };
        if changed {
            self.dirty.insert(to_dir);
        }
    }

    /// Drops the cached store of a removed directory.
    pub fn forget_dir(&mut self, dir: &ExportPath) {
        self.stores.remove(dir);
        self.dirty.remove(dir);
    }

    /// Re-keys every cached store at or below `from` after a directory rename.
    pub fn rebase_dirs(&mut self, from: &ExportPath, to: &ExportPath) {
        let moved: Vec<ExportPath> =
            self.stores.keys().filter(|dir| dir.is_within(from)).cloned().collect();
        for old in moved {
            let Some(new) = old.rebase(from, to) else {
                continue;
            };
            if let Some(store) = self.stores.remove(&old) {
                self.stores.insert(new.clone(), store);
            }
            if self.dirty.remove(&old) {
                self.dirty.insert(new);
            }
        }
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Writes every dirty store to its sidecar and clears the dirty set.
    ///
    /// A store with nothing to persist has its sidecar removed. Failures are
    /// logged per directory and do not stop the flush. Returns the number of
    /// directories written or cleaned.
    pub fn flush_all_dirty(&mut self) -> usize {
        let dirty = std::mem::take(&mut self.dirty);
        let mut flushed = 0;
        for dir in dirty {
            let Some(store) = self.stores.get(&dir) else {
                continue;
            };
            let sidecar = self.sidecar_path(&dir);
            let data = store.serialize();
            let result = if data.is_empty() {
                match std::fs::remove_file(&sidecar) {
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                    other => other,
                }
            } else {
                std::fs::write(&sidecar, &data)
            };
            match result {
                Ok(()) => {
                    debug!("flushed attributes of {} ({} bytes)", dir, data.len());
                    flushed += 1;
                }
                Err(e) => warn!("failed to flush attributes of {}: {}", dir, e),
            }
        }
        flushed
    }
}

fn load_sidecar(path: &Path) -> DirAttrs {
    match std::fs::read(path) {
        Ok(data) => DirAttrs::parse(&data),
        Err(e) if e.kind() == io::ErrorKind::NotFound => DirAttrs::default(),
        Err(e) => {
            warn!("cannot read {:?}: {}", path, e);
            DirAttrs::default()
        }
    }
}

/// True for the reserved sidecar name.
pub fn is_shadow_file(name: &OsStr) -> bool {
    name.as_bytes() == SHADOW_FILE_NAME.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_util::{S_IFCHR, S_IFREG};

    fn entry(rel: &str) -> ExportPath {
        ExportPath::from_relative(Path::new(rel))
    }

    #[test]
    fn parse_skips_malformed_and_truncated_lines() {
        let data = b"0100400:10:20:4294967295:a.txt\nnot a line\n0644:1:2:3\n0600:0:0:0:cut";
        let attrs = DirAttrs::parse(data);
        assert_eq!(attrs.len(), 1);
        let record = attrs.get(b"a.txt").expect("a.txt parsed");
        assert_eq!(record.mode, S_IFREG | 0o400);
        assert_eq!(record.uid, 10);
        assert_eq!(record.gid, 20);
        assert_eq!(record.rdev, UNSET);
    }

    #[test]
    fn names_may_contain_colons() {
        let (name, record) = AttrRecord::parse_line(b"0755:0:0:0:a:b").expect("parsed");
        assert_eq!(name, b"a:b");
        assert_eq!(record.mode, 0o755);
    }

    #[test]
    fn dot_entries_are_never_stored() {
        assert!(AttrRecord::parse_line(b"0755:0:0:0:..").is_none());
        assert!(AttrRecord::with_mode(0o755).to_line(b".").is_none());
    }

    #[test]
    fn line_format() {
        let record = AttrRecord { mode: 0o400, uid: 5, gid: 6, ..Default::default() };
        let line = record.to_line(b"f").expect("persistent");
        assert_eq!(line, b"0400:5:6:4294967295:f\n");
    }

    #[test]
    fn overlay_keeps_host_values_for_unset_fields() {
        let mut attrs =
            FileAttrs { mode: S_IFREG | 0o644, uid: 1000, gid: 1000, ..Default::default() };
        let record = AttrRecord { mode: 0o400, gid: 0, ..Default::default() };
        record.overlay(&mut attrs);
        assert_eq!(attrs.mode, S_IFREG | 0o400);
        assert_eq!(attrs.uid, 1000);
        assert_eq!(attrs.gid, 0);
        let once = attrs;
        record.overlay(&mut attrs);
        assert_eq!(attrs, once);
    }

    #[test]
    fn overlay_replaces_format_bits_when_tracked() {
        let mut attrs = FileAttrs { mode: S_IFREG | 0o644, ..Default::default() };
        AttrRecord { mode: S_IFCHR | 0o600, rdev: 0x0302, ..Default::default() }
            .overlay(&mut attrs);
        assert_eq!(attrs.mode, S_IFCHR | 0o600);
        assert_eq!(attrs.rdev, 0x0302);
    }

    #[test]
    fn set_merge_and_flush() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut db = FileAttrDb::new(dir.path().to_path_buf());
        db.set(&entry("f"), &AttrRecord::with_mode(0o400));
        db.set(&entry("f"), &AttrRecord { uid: 7, ..Default::default() });
        assert_eq!(db.dirty_count(), 1);
        assert_eq!(db.flush_all_dirty(), 1);
        assert_eq!(db.dirty_count(), 0);
        let written = std::fs::read(dir.path().join(SHADOW_FILE_NAME)).expect("sidecar");
        assert_eq!(written, b"0400:7:4294967295:4294967295:f\n");

        let mut reloaded = FileAttrDb::new(dir.path().to_path_buf());
        let record = reloaded.get(&entry("f")).expect("persisted");
        assert_eq!(record.mode, 0o400);
        assert_eq!(record.uid, 7);

        reloaded.remove(&entry("f"));
        reloaded.flush_all_dirty();
        assert!(!dir.path().join(SHADOW_FILE_NAME).exists());
    }

    #[test]
    fn flush_without_changes_does_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut db = FileAttrDb::new(dir.path().to_path_buf());
        assert_eq!(db.get(&entry("missing")), None);
        assert_eq!(db.flush_all_dirty(), 0);
        assert!(!dir.path().join(SHADOW_FILE_NAME).exists());
    }

    #[test]
    fn rename_migrates_records_across_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        let mut db = FileAttrDb::new(dir.path().to_path_buf());
        db.set(&entry("a"), &AttrRecord::with_mode(0o600));
        db.rename(&entry("a"), &entry("sub/b"));
        assert_eq!(db.get(&entry("a")), None);
        assert_eq!(db.get(&entry("sub/b")).map(|r| r.mode), Some(0o600));
        assert_eq!(db.flush_all_dirty(), 2);
        assert!(!dir.path().join(SHADOW_FILE_NAME).exists());
        assert!(dir.path().join("sub").join(SHADOW_FILE_NAME).exists());
    }

    #[test]
    fn root_is_never_shadowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut db = FileAttrDb::new(dir.path().to_path_buf());
        db.set(&ExportPath::root(), &AttrRecord::with_mode(0o700));
        assert_eq!(db.get(&ExportPath::root()), None);
        assert_eq!(db.dirty_count(), 0);
    }
}
