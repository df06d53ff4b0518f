use serde::Deserialize;

use crate::fs_util::{make_rdev, FileAttrs, MODE_PERM_MASK, S_IFBLK, S_IFCHR};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Block,
    Char,
}

/// One device node presented under a directory named `dev`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub kind: DeviceKind,
    pub major: u32,
    pub minor: u32,
}

impl DeviceSpec {
    fn new(name: &str, kind: DeviceKind, major: u32, minor: u32) -> Self {
        DeviceSpec { name: name.to_string(), kind, major, minor }
    }
}

/// Names that `stat` reports as block or character devices when they sit in
/// a directory named `dev`, whatever the host object really is.
#[derive(Clone, Debug)]
pub struct DeviceTable {
    entries: Vec<DeviceSpec>,
}

impl DeviceTable {
    pub fn new(entries: Vec<DeviceSpec>) -> Self {
        DeviceTable { entries }
    }

    pub fn lookup(&self, name: &[u8]) -> Option<&DeviceSpec> {
        self.entries.iter().find(|d| d.name.as_bytes() == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrites the type bits and device number of `attrs` from `spec`.
    pub fn apply(spec: &DeviceSpec, attrs: &mut FileAttrs) {
        let format = match spec.kind {
            DeviceKind::Block => S_IFBLK,
            DeviceKind::Char => S_IFCHR,
        };
        attrs.mode = format | (attrs.mode & MODE_PERM_MASK);
        attrs.rdev = make_rdev(spec.major, spec.minor);
        attrs.size = 0;
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        use DeviceKind::*;
        DeviceTable::new(vec![
            DeviceSpec::new("console", Char, 0, 0),
            DeviceSpec::new("tty", Char, 2, 0),
            DeviceSpec::new("mem", Char, 3, 0),
            DeviceSpec::new("kmem", Char, 3, 1),
            DeviceSpec::new("null", Char, 3, 2),
            DeviceSpec::new("zero", Char, 3, 12),
            DeviceSpec::new("sd0a", Block, 6, 0),
            DeviceSpec::new("sd0b", Block, 6, 1),
            DeviceSpec::new("rsd0a", Char, 14, 0),
            DeviceSpec::new("rsd0b", Char, 14, 1),
            DeviceSpec::new("fd0a", Block, 1, 0),
            DeviceSpec::new("rfd0a", Char, 41, 0),
        ])
    }
}
