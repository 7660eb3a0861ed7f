//! Mapping between the inode numbers the kernel holds references to and
//! mirror-relative pathnames.
//!
//! `spec.md` describes a path-addressed kernel upcall dispatcher; the
//! `fuser` binding used here hands out opaque inode numbers instead and
//! expects the filesystem to remember what path each one denotes. This
//! table is the concrete realization of that external collaborator's
//! inode-indexed half, playing the same role for the FS façade that
//! [`crate::path_mapper::relative_path`] plays for a literal virtual path.

use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// The inode number FUSE always assigns to the mount's root.
pub const ROOT_INO: u64 = 1;

struct Entry
{
    path: PathBuf,
    lookups: u64,
}

/// Owns the inode <-> path mapping for one mount.
///
/// Not `Send`/`Sync`-guarded internally: the `fuser::Filesystem` trait
/// takes `&mut self` on every upcall, so the crate's own dispatch already
/// serializes access to this table; no additional locking is needed.
pub struct InodeTable
{
    by_ino: HashMap<u64, Entry>,
    by_path: HashMap<PathBuf, u64>,
    next_ino: u64,
}

impl InodeTable
{
    /// Create a table with only the root inode populated, mapped to `.`.
    pub fn new() -> Self
    {
        let mut by_ino = HashMap::new();
        by_ino.insert(ROOT_INO, Entry { path: PathBuf::from("."), lookups: 1 });
        let mut by_path = HashMap::new();
        by_path.insert(PathBuf::from("."), ROOT_INO);

        Self { by_ino, by_path, next_ino: ROOT_INO + 1 }
    }

    /// The mirror-relative path recorded for `ino`, if it is still held.
    pub fn path(&self, ino: u64) -> Option<&Path>
    {
        self.by_ino.get(&ino).map(|entry| entry.path.as_path())
    }

    fn join(parent_path: &Path, name: &OsStr) -> PathBuf
    {
        if parent_path == Path::new(".") {
            PathBuf::from(name)
        } else {
            parent_path.join(name)
        }
    }

    /// Resolve `name` under `parent`'s path to the child's mirror-relative
    /// path, without touching the table.
    pub fn child_path(&self, parent: u64, name: &OsStr) -> Option<PathBuf>
    {
        Some(Self::join(self.path(parent)?, name))
    }

    /// Resolve `(parent, name)` to an inode, allocating a fresh one if
    /// this is the first lookup for that path, and incrementing its
    /// lookup count -- the kernel promises exactly one `forget` call per
    /// successful `lookup` reply (batched counts included).
    pub fn lookup(&mut self, parent: u64, name: &OsStr) -> Option<u64>
    {
        let child_path = self.child_path(parent, name)?;
        Some(self.intern(child_path))
    }

    /// Record a path as having one more outstanding lookup reference,
    /// allocating a new inode if none exists for it yet. Used both by
    /// [`Self::lookup`] and by creating operations (`create`, `mkdir`,
    /// `symlink`, `mknod`, `link`) that hand the kernel a fresh entry.
    pub fn intern(&mut self, path: PathBuf) -> u64
    {
        if let Some(&ino) = self.by_path.get(&path) {
            self.by_ino.get_mut(&ino).unwrap().lookups += 1;
            return ino;
        }

        let ino = self.next_ino;
        self.next_ino += 1;
        self.by_ino.insert(ino, Entry { path: path.clone(), lookups: 1 });
        self.by_path.insert(path, ino);
        ino
    }

    /// Decrement `ino`'s lookup count by `n`, evicting the entry at zero.
    /// The root inode is never evicted.
    pub fn forget(&mut self, ino: u64, n: u64)
    {
        if ino == ROOT_INO {
            return;
        }

        let Some(entry) = self.by_ino.get_mut(&ino) else { return };
        entry.lookups = entry.lookups.saturating_sub(n);

        if entry.lookups == 0 {
            let path = entry.path.clone();
            self.by_ino.remove(&ino);
            self.by_path.remove(&path);
        }
    }

    /// Update every entry whose path is `old_path` or a descendant of it
    /// to instead live under `new_path`, following a rename.
    pub fn rename(&mut self, old_path: &Path, new_path: &Path)
    {
        let affected: Vec<(u64, PathBuf)> = self
            .by_ino
            .iter()
            .filter_map(|(&ino, entry)| {
                let rest = entry.path.strip_prefix(old_path).ok()?;
                let rebased = if rest.as_os_str().is_empty() {
                    new_path.to_path_buf()
                } else {
                    new_path.join(rest)
                };
                Some((ino, rebased))
            })
            .collect();

        for (ino, rebased) in affected {
            let entry = self.by_ino.get_mut(&ino).unwrap();
            self.by_path.remove(&entry.path);
            entry.path = rebased.clone();
            self.by_path.insert(rebased, ino);
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn root_is_preseeded()
    {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO), Some(Path::new(".")));
    }

    #[test]
    fn lookup_allocates_then_reuses()
    {
        let mut table = InodeTable::new();
        let a = table.lookup(ROOT_INO, OsStr::new("a")).unwrap();
        let a_again = table.lookup(ROOT_INO, OsStr::new("a")).unwrap();
        assert_eq!(a, a_again);
        assert_eq!(table.path(a), Some(Path::new("a")));
    }

    #[test]
    fn forget_evicts_at_zero()
    {
        let mut table = InodeTable::new();
        let a = table.lookup(ROOT_INO, OsStr::new("a")).unwrap();
        table.lookup(ROOT_INO, OsStr::new("a")).unwrap(); // lookups = 2
        table.forget(a, 1);
        assert!(table.path(a).is_some());
        table.forget(a, 1);
        assert!(table.path(a).is_none());
    }

    #[test]
    fn rename_rebases_descendants()
    {
        let mut table = InodeTable::new();
        let dir = table.lookup(ROOT_INO, OsStr::new("dir")).unwrap();
        let child = table.lookup(dir, OsStr::new("child")).unwrap();

        table.rename(Path::new("dir"), Path::new("moved"));

        assert_eq!(table.path(dir), Some(Path::new("moved")));
        assert_eq!(table.path(child), Some(Path::new("moved/child")));
    }
}
