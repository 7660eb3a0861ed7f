//! Open-file state: the resource backing one kernel handle, tagged by
//! kind, plus the table that allocates and owns handle numbers.

use {
    os_ext::dirent::Dir,
    std::{collections::HashMap, os::unix::io::OwnedFd, path::PathBuf},
};

/// The concrete resource backing one open handle.
pub enum HandleKind
{
    /// A pass-through descriptor opened directly on the mirror.
    File(OwnedFd),

    /// An unlinked temp descriptor holding a script's materialized stdout.
    Script(OwnedFd),

    /// An open directory stream.
    Folder(Dir),
}

/// One open-file record, addressed by the kernel's opaque handle number.
///
/// `relative_name` is advisory: classification is never reconsulted from
/// it at read/write time. It exists so that handle-only metadata calls
/// (chmod/truncate/utimens addressed by handle rather than by path) can
/// still recognize a script without re-deriving its path -- see
/// `spec.md` §9, open question (c).
pub struct Handle
{
    pub kind: HandleKind,
    pub relative_name: PathBuf,
}

impl Handle
{
    pub fn is_script(&self) -> bool
    {
        matches!(self.kind, HandleKind::Script(_))
    }
}

/// Allocates and owns kernel-visible handle numbers.
///
/// This is an independent namespace from inode numbers: a single inode
/// may have several handles open on it concurrently (two readers of the
/// same script, say), each materializing or opening its own descriptor
/// independently, per `spec.md` §3's "script materialization is never
/// shared across opens" non-goal.
#[derive(Default)]
pub struct HandleTable
{
    next: u64,
    handles: HashMap<u64, Handle>,
}

impl HandleTable
{
    pub fn new() -> Self
    {
        Self { next: 1, handles: HashMap::new() }
    }

    /// Insert a handle, returning the kernel-visible number assigned to it.
    pub fn insert(&mut self, handle: Handle) -> u64
    {
        let fh = self.next;
        self.next += 1;
        self.handles.insert(fh, handle);
        fh
    }

    pub fn get(&self, fh: u64) -> Option<&Handle>
    {
        self.handles.get(&fh)
    }

    pub fn get_mut(&mut self, fh: u64) -> Option<&mut Handle>
    {
        self.handles.get_mut(&fh)
    }

    /// Remove and return a handle; the caller is responsible for closing
    /// whatever descriptor it owns (dropping it is sufficient, since
    /// `OwnedFd` and `Dir` both close on drop).
    pub fn remove(&mut self, fh: u64) -> Option<Handle>
    {
        self.handles.remove(&fh)
    }
}

#[cfg(test)]
mod tests
{
    use {super::*, std::os::unix::io::FromRawFd};

    fn dup_stdin() -> OwnedFd
    {
        // SAFETY: fd 0 is always open in a test process; dup(2) returns a
        //         new, independently-owned descriptor.
        unsafe { OwnedFd::from_raw_fd(libc::dup(0)) }
    }

    #[test]
    fn insert_assigns_increasing_numbers()
    {
        let mut table = HandleTable::new();
        let fh1 = table.insert(Handle {
            kind: HandleKind::File(dup_stdin()),
            relative_name: PathBuf::from("a"),
        });
        let fh2 = table.insert(Handle {
            kind: HandleKind::File(dup_stdin()),
            relative_name: PathBuf::from("b"),
        });
        assert_ne!(fh1, fh2);
        assert_eq!(table.get(fh1).unwrap().relative_name, PathBuf::from("a"));
        assert_eq!(table.get(fh2).unwrap().relative_name, PathBuf::from("b"));
    }

    #[test]
    fn remove_drops_the_handle()
    {
        let mut table = HandleTable::new();
        let fh = table.insert(Handle {
            kind: HandleKind::File(dup_stdin()),
            relative_name: PathBuf::from("a"),
        });
        assert!(table.remove(fh).is_some());
        assert!(table.get(fh).is_none());
    }
}
