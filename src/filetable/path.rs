use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A canonical path inside the export, always absolute with the export root
/// as `/`.
///
/// Values are produced by `FileTable::canonicalize`, so the directory part is
/// symlink-free and every instance names at most one host object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExportPath(PathBuf);

impl ExportPath {
    pub fn root() -> Self {
        ExportPath(PathBuf::from("/"))
    }

    /// Builds a path from a root-relative host path (as returned by
    /// `strip_prefix` on a canonical host directory).
    pub(crate) fn from_relative(rel: &Path) -> Self {
        let mut path = PathBuf::from("/");
        path.push(rel);
        ExportPath(path)
    }

    pub fn is_root(&self) -> bool {
        self.0.parent().is_none()
    }

    pub fn parent(&self) -> Option<ExportPath> {
        self.0.parent().map(|p| ExportPath(p.to_path_buf()))
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.0.file_name()
    }

    /// Appends a single, already validated component.
    pub fn join(&self, name: &OsStr) -> ExportPath {
        ExportPath(self.0.join(name))
    }

    /// The path without its leading `/`, for joining onto the host root.
    pub fn relative(&self) -> &Path {
        self.0.strip_prefix("/").unwrap_or(&self.0)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// True if `self` is `ancestor` or lies below it.
    pub fn is_within(&self, ancestor: &ExportPath) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Re-roots `self` from `from` onto `to`, if `self` is within `from`.
    pub fn rebase(&self, from: &ExportPath, to: &ExportPath) -> Option<ExportPath> {
        let rest = self.0.strip_prefix(&from.0).ok()?;
        if rest.as_os_str().is_empty() {
            return Some(to.clone());
        }
        Some(ExportPath(to.0.join(rest)))
    }
}

/// Splits a request path into its directory part and optional leaf name.
///
/// A trailing `.` or `..` is left in the directory part so that `realpath`
/// resolves it.
pub(crate) fn split_leaf(path: &Path) -> (PathBuf, Option<&OsStr>) {
    let rel = path.strip_prefix("/").unwrap_or(path);
    let mut components = rel.components();
    match components.next_back() {
        Some(Component::Normal(leaf)) => (components.as_path().to_path_buf(), Some(leaf)),
        Some(_) => (rel.to_path_buf(), None),
        None => (PathBuf::new(), None),
    }
}

impl fmt::Debug for ExportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for ExportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebase_moves_descendants() {
        let from = ExportPath::from_relative(Path::new("a"));
        let to = ExportPath::from_relative(Path::new("b/c"));
        let child = ExportPath::from_relative(Path::new("a/x/y"));
        assert_eq!(child.rebase(&from, &to), Some(ExportPath::from_relative(Path::new("b/c/x/y"))));
        assert_eq!(from.rebase(&from, &to), Some(to.clone()));
        let other = ExportPath::from_relative(Path::new("ab"));
        assert_eq!(other.rebase(&from, &to), None);
    }

    #[test]
    fn split_keeps_dot_components_in_directory() {
        let (dir, leaf) = split_leaf(Path::new("/a/b"));
        assert_eq!(dir, PathBuf::from("a"));
        assert_eq!(leaf, Some(OsStr::new("b")));
        let (dir, leaf) = split_leaf(Path::new("/a/.."));
        assert_eq!(dir, PathBuf::from("a/.."));
        assert_eq!(leaf, None);
        let (dir, leaf) = split_leaf(Path::new("/"));
        assert_eq!(dir, PathBuf::new());
        assert_eq!(leaf, None);
    }

    #[test]
    fn root_has_no_parent() {
        assert!(ExportPath::root().is_root());
        assert_eq!(ExportPath::root().parent(), None);
        assert_eq!(ExportPath::root().relative(), Path::new(""));
    }
}
