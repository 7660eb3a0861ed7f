//! The `fuser::Filesystem` façade: translates kernel upcalls into calls on
//! the classification core, the inode table, and the handle table.
//!
//! Every upcall that needs a file's identity resolves it through
//! [`InodeTable::path`] first, so classification is always available, even
//! on the handle-only metadata calls (`setattr` by `fh`) that the original
//! implementation's `FileStruct`-only path used to skip.

use {
    crate::inode_table::{InodeTable, ROOT_INO},
    fuser::{
        FileAttr, FileType, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData,
        ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyLseek, ReplyOpen, ReplyStatfs, ReplyWrite,
        Request, TimeOrNow,
    },
    libc::c_int,
    os_ext::{
        dirent::Dir,
        fcntl, stdio, sys_stat, sys_statvfs,
        unistd,
    },
    scriptfs_core::{
        handle::{Handle, HandleKind, HandleTable},
        procedure::Procedure,
        state::{SizeMode, State},
    },
    std::{
        ffi::OsStr,
        os::unix::{
            ffi::OsStrExt,
            io::{AsFd, BorrowedFd},
        },
        path::{Path, PathBuf},
        time::{Duration, SystemTime, UNIX_EPOCH},
    },
};

/// Attribute and entry cache lifetime handed back to the kernel. Short,
/// since a script's materialized size can change between calls.
const TTL: Duration = Duration::from_secs(1);

/// `FOPEN_DIRECT_IO`: tells the kernel not to cache this handle's content
/// or trust a previously cached size. Set on every script open, since a
/// script's output can differ from one run to the next.
const FOPEN_DIRECT_IO: u32 = 1 << 0;

pub struct ScriptFs
{
    state: State,
    inodes: InodeTable,
    handles: HandleTable,
}

impl ScriptFs
{
    pub fn new(state: State) -> Self
    {
        Self { state, inodes: InodeTable::new(), handles: HandleTable::new() }
    }

    fn mirror_dir(&self) -> BorrowedFd<'_>
    {
        self.state.mirror_dir.as_fd()
    }

    /// Resolve `ino` to the mirror-relative path the inode table has
    /// recorded for it, replying `ENOENT` and returning `None` if it is
    /// no longer (or never was) held.
    fn resolve(&self, ino: u64) -> Option<PathBuf>
    {
        self.inodes.path(ino).map(Path::to_path_buf)
    }

    /// Classify `relative` if it names an on-disk regular file, cloning
    /// the matched procedure out so the borrow on `self.state` does not
    /// outlive this call.
    fn classify_regular(&self, relative: &Path, st: &libc::stat) -> Option<Procedure>
    {
        if (st.st_mode & libc::S_IFMT) != libc::S_IFREG {
            return None;
        }
        self.state.classify(relative).cloned()
    }

    /// Materialize `relative` under `procedure` purely to learn its
    /// output length; failures are logged and treated as "no override",
    /// falling back to the stored source size.
    fn materialized_size(&self, relative: &Path, procedure: &Procedure) -> Option<u64>
    {
        match self.state.run_script(relative, procedure) {
            Ok(fd) => match sys_stat::fstat(fd.as_fd()) {
                Ok(st) => Some(st.st_size as u64),
                Err(err) => {
                    log::warn!("stat of materialized {}: {err}", relative.display());
                    None
                }
            },
            Err(err) => {
                log::warn!("materializing {} for size: {err}", relative.display());
                None
            }
        }
    }

    /// Build the `FileAttr` the kernel should see for `relative`, given
    /// its raw stat buffer. Write bits are masked off a matched script's
    /// permissions and, in `Materialized` size mode, its stdout length is
    /// substituted for the source file's size.
    fn attr_for(&self, ino: u64, relative: &Path, st: &libc::stat) -> FileAttr
    {
        let procedure = self.classify_regular(relative, st);
        let matched = procedure.is_some();
        let size = match (&procedure, self.state.size_mode) {
            (Some(procedure), SizeMode::Materialized) => self.materialized_size(relative, procedure),
            _ => None,
        };
        make_attr(ino, st, matched, size)
    }

    fn stat_relative(&self, relative: &Path) -> std::io::Result<libc::stat>
    {
        sys_stat::fstatat(Some(self.mirror_dir()), relative, libc::AT_SYMLINK_NOFOLLOW)
    }
}

fn io_errno(err: &std::io::Error) -> i32
{
    err.raw_os_error().unwrap_or(libc::EIO)
}

fn file_type(mode: libc::mode_t) -> FileType
{
    match mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFLNK => FileType::Symlink,
        libc::S_IFCHR => FileType::CharDevice,
        libc::S_IFBLK => FileType::BlockDevice,
        libc::S_IFIFO => FileType::NamedPipe,
        libc::S_IFSOCK => FileType::Socket,
        _ => FileType::RegularFile,
    }
}

fn systemtime_from(sec: libc::time_t, nsec: i64) -> SystemTime
{
    if sec >= 0 {
        UNIX_EPOCH + Duration::new(sec as u64, nsec as u32)
    } else {
        UNIX_EPOCH - Duration::new((-sec) as u64, 0)
    }
}

/// Build a `FileAttr` from a raw stat buffer, optionally masking off
/// write permission bits and overriding the reported size.
fn make_attr(ino: u64, st: &libc::stat, mask_write: bool, size_override: Option<u64>) -> FileAttr
{
    let mut perm = (st.st_mode & 0o7777) as u16;
    if mask_write {
        perm &= !0o222;
    }

    let ctime = systemtime_from(st.st_ctime, st.st_ctime_nsec as i64);

    FileAttr {
        ino,
        size: size_override.unwrap_or(st.st_size as u64),
        blocks: st.st_blocks as u64,
        atime: systemtime_from(st.st_atime, st.st_atime_nsec as i64),
        mtime: systemtime_from(st.st_mtime, st.st_mtime_nsec as i64),
        ctime,
        // Linux has no birth time in `struct stat`; reuse ctime, as
        // passthrough filesystems conventionally do.
        crtime: ctime,
        kind: file_type(st.st_mode),
        perm,
        nlink: st.st_nlink as u32,
        uid: st.st_uid,
        gid: st.st_gid,
        rdev: st.st_rdev as u32,
        blksize: st.st_blksize as u32,
        flags: 0,
    }
}

fn time_or_now_to_timespec(time: Option<TimeOrNow>) -> libc::timespec
{
    match time {
        None => libc::timespec { tv_sec: 0, tv_nsec: libc::UTIME_OMIT },
        Some(TimeOrNow::Now) => libc::timespec { tv_sec: 0, tv_nsec: libc::UTIME_NOW },
        Some(TimeOrNow::SpecificTime(time)) => {
            let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
            libc::timespec {
                tv_sec: since_epoch.as_secs() as libc::time_t,
                tv_nsec: since_epoch.subsec_nanos() as i64,
            }
        }
    }
}

/// Map a dirent's `d_type` to a `FileType`, falling back to `fstatat` when
/// the backing filesystem left it `DT_UNKNOWN`.
fn dtype_to_filetype(mirror_dir: BorrowedFd, relative_dir: &Path, name: &OsStr, d_type: u8) -> FileType
{
    match d_type {
        libc::DT_DIR => FileType::Directory,
        libc::DT_REG => FileType::RegularFile,
        libc::DT_LNK => FileType::Symlink,
        libc::DT_FIFO => FileType::NamedPipe,
        libc::DT_SOCK => FileType::Socket,
        libc::DT_CHR => FileType::CharDevice,
        libc::DT_BLK => FileType::BlockDevice,
        _ => match sys_stat::fstatat(Some(mirror_dir), relative_dir.join(name), libc::AT_SYMLINK_NOFOLLOW) {
            Ok(st) => file_type(st.st_mode),
            Err(_) => FileType::RegularFile,
        },
    }
}

impl Filesystem for ScriptFs
{
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), c_int>
    {
        log::info!("mounted {}", self.state.mirror_path.display());
        Ok(())
    }

    fn destroy(&mut self)
    {
        log::info!("unmounted");
    }

    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry)
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.stat_relative(&relative) {
            Ok(st) => {
                let ino = self.inodes.intern(relative.clone());
                reply.entry(&TTL, &self.attr_for(ino, &relative, &st), 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64)
    {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr)
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.stat_relative(&relative) {
            Ok(st) => reply.attr(&TTL, &self.attr_for(ino, &relative, &st)),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    )
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let is_script = match self.stat_relative(&relative) {
            Ok(st) => self.classify_regular(&relative, &st).is_some(),
            Err(err) => {
                reply.error(io_errno(&err));
                return;
            }
        };

        if let Some(requested) = mode {
            let mut effective = requested as libc::mode_t;
            if is_script {
                effective &= !0o222;
            }
            if let Err(err) = sys_stat::fchmodat(Some(self.mirror_dir()), &relative, effective, 0) {
                reply.error(io_errno(&err));
                return;
            }
        }

        if let Some(new_size) = size {
            if is_script {
                reply.error(libc::EACCES);
                return;
            }
            let result = match fh.and_then(|fh| self.handles.get(fh)) {
                Some(Handle { kind: HandleKind::File(fd), .. }) => {
                    unistd::ftruncate(fd.as_fd(), new_size as libc::off_t)
                }
                Some(_) => Err(std::io::Error::from_raw_os_error(libc::EBADF)),
                None => fcntl::openat(Some(self.mirror_dir()), &relative, libc::O_WRONLY, 0)
                    .and_then(|fd| unistd::ftruncate(fd.as_fd(), new_size as libc::off_t)),
            };
            if let Err(err) = result {
                reply.error(io_errno(&err));
                return;
            }
        }

        if atime.is_some() || mtime.is_some() {
            if is_script {
                reply.error(libc::EACCES);
                return;
            }
            let times = [time_or_now_to_timespec(atime), time_or_now_to_timespec(mtime)];
            if let Err(err) = sys_stat::utimensat(Some(self.mirror_dir()), &relative, &times, 0) {
                reply.error(io_errno(&err));
                return;
            }
        }

        match self.stat_relative(&relative) {
            Ok(st) => reply.attr(&TTL, &self.attr_for(ino, &relative, &st)),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData)
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match unistd::readlinkat(Some(self.mirror_dir()), &relative) {
            Ok(target) => reply.data(target.as_os_str().as_bytes()),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    )
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(err) = sys_stat::mknodat(
            Some(self.mirror_dir()), &relative, mode as libc::mode_t, rdev as libc::dev_t,
        ) {
            reply.error(io_errno(&err));
            return;
        }

        match self.stat_relative(&relative) {
            Ok(st) => {
                let ino = self.inodes.intern(relative.clone());
                reply.entry(&TTL, &self.attr_for(ino, &relative, &st), 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    )
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(err) = sys_stat::mkdirat(Some(self.mirror_dir()), &relative, mode as libc::mode_t) {
            reply.error(io_errno(&err));
            return;
        }

        match self.stat_relative(&relative) {
            Ok(st) => {
                let ino = self.inodes.intern(relative.clone());
                reply.entry(&TTL, &self.attr_for(ino, &relative, &st), 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty)
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match unistd::unlinkat(Some(self.mirror_dir()), &relative, 0) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty)
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match unistd::unlinkat(Some(self.mirror_dir()), &relative, libc::AT_REMOVEDIR) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    )
    {
        let Some(relative) = self.inodes.child_path(parent, link_name) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(err) = unistd::symlinkat(target, Some(self.mirror_dir()), &relative) {
            reply.error(io_errno(&err));
            return;
        }

        match self.stat_relative(&relative) {
            Ok(st) => {
                let ino = self.inodes.intern(relative.clone());
                reply.entry(&TTL, &self.attr_for(ino, &relative, &st), 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    )
    {
        let (Some(old_relative), Some(new_relative)) = (
            self.inodes.child_path(parent, name),
            self.inodes.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };

        match stdio::renameat2(
            Some(self.mirror_dir()), &old_relative,
            Some(self.mirror_dir()), &new_relative, flags,
        ) {
            Ok(()) => {
                self.inodes.rename(&old_relative, &new_relative);
                reply.ok();
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    )
    {
        let (Some(old_relative), Some(new_relative)) = (
            self.resolve(ino),
            self.inodes.child_path(newparent, newname),
        ) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(err) = unistd::linkat(
            Some(self.mirror_dir()), &old_relative,
            Some(self.mirror_dir()), &new_relative, 0,
        ) {
            reply.error(io_errno(&err));
            return;
        }

        match self.stat_relative(&new_relative) {
            Ok(st) => {
                let new_ino = self.inodes.intern(new_relative.clone());
                reply.entry(&TTL, &self.attr_for(new_ino, &new_relative, &st), 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen)
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        let procedure = match self.stat_relative(&relative) {
            Ok(st) => self.classify_regular(&relative, &st),
            Err(err) => {
                reply.error(io_errno(&err));
                return;
            }
        };

        if let Some(procedure) = procedure {
            if (flags & libc::O_ACCMODE) != libc::O_RDONLY {
                reply.error(libc::EACCES);
                return;
            }
            match self.state.run_script(&relative, &procedure) {
                Ok(fd) => {
                    let fh = self.handles.insert(Handle {
                        kind: HandleKind::Script(fd),
                        relative_name: relative,
                    });
                    reply.opened(fh, FOPEN_DIRECT_IO);
                }
                Err(err) => reply.error(err.raw_os_error()),
            }
            return;
        }

        match fcntl::openat(Some(self.mirror_dir()), &relative, flags, 0) {
            Ok(fd) => {
                let fh = self.handles.insert(Handle {
                    kind: HandleKind::File(fd),
                    relative_name: relative,
                });
                reply.opened(fh, 0);
            }
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    )
    {
        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let fd = match &handle.kind {
            HandleKind::File(fd) | HandleKind::Script(fd) => fd.as_fd(),
            HandleKind::Folder(_) => {
                reply.error(libc::EISDIR);
                return;
            }
        };

        if let Err(err) = unistd::lseek(fd, offset, libc::SEEK_SET) {
            reply.error(io_errno(&err));
            return;
        }

        let mut buf = vec![0u8; size as usize];
        let mut total = 0;
        while total < buf.len() {
            match unistd::read(fd, &mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(err) => {
                    reply.error(io_errno(&err));
                    return;
                }
            }
        }
        buf.truncate(total);
        reply.data(&buf);
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    )
    {
        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let fd = match &handle.kind {
            HandleKind::Script(_) => {
                reply.error(libc::EACCES);
                return;
            }
            HandleKind::File(fd) => fd.as_fd(),
            HandleKind::Folder(_) => {
                reply.error(libc::EISDIR);
                return;
            }
        };

        if let Err(err) = unistd::lseek(fd, offset, libc::SEEK_SET) {
            reply.error(io_errno(&err));
            return;
        }

        let mut total = 0;
        while total < data.len() {
            match unistd::write(fd, &data[total..]) {
                Ok(n) => total += n,
                Err(err) => {
                    reply.error(io_errno(&err));
                    return;
                }
            }
        }
        reply.written(total as u32);
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty)
    {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    )
    {
        self.handles.remove(fh);
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty)
    {
        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let fd = match &handle.kind {
            HandleKind::File(fd) | HandleKind::Script(fd) => fd.as_fd(),
            HandleKind::Folder(_) => {
                reply.ok();
                return;
            }
        };

        match unistd::fsync(fd) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen)
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match fcntl::openat(Some(self.mirror_dir()), &relative, libc::O_RDONLY | libc::O_DIRECTORY, 0) {
            Ok(fd) => match Dir::fdopendir(fd) {
                Ok(dir) => {
                    let fh = self.handles.insert(Handle {
                        kind: HandleKind::Folder(dir),
                        relative_name: relative,
                    });
                    reply.opened(fh, 0);
                }
                Err(err) => reply.error(io_errno(&err)),
            },
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn readdir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, offset: i64, mut reply: ReplyDirectory)
    {
        let Some(handle) = self.handles.get_mut(fh) else {
            reply.error(libc::EBADF);
            return;
        };
        let relative_dir = handle.relative_name.clone();
        let HandleKind::Folder(dir) = &mut handle.kind else {
            reply.error(libc::ENOTDIR);
            return;
        };

        // `offset` addresses a stream position, not a byte count; since
        // `DIR*` streams only expose sequential iteration, re-walk from
        // the start and skip ahead each call rather than trying to seek.
        os_ext::dirent::rewinddir(dir);

        let mut entries = Vec::new();
        let mut index = 0i64;
        loop {
            match dir.readdir() {
                Ok(Some(entry)) => {
                    index += 1;
                    if index > offset {
                        entries.push((index, entry));
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    reply.error(io_errno(&err));
                    return;
                }
            }
        }

        for (index, entry) in entries {
            let name = OsStr::from_bytes(entry.name.as_bytes());
            let kind = dtype_to_filetype(self.state.mirror_dir.as_fd(), &relative_dir, name, entry.d_type);
            if reply.add(0, index, kind, name) {
                break;
            }
        }

        reply.ok();
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _flags: i32, reply: ReplyEmpty)
    {
        self.handles.remove(fh);
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs)
    {
        match sys_statvfs::fstatvfs(self.mirror_dir()) {
            Ok(vfs) => reply.statfs(
                vfs.f_blocks, vfs.f_bfree, vfs.f_bavail,
                vfs.f_files, vfs.f_ffree,
                vfs.f_bsize as u32, vfs.f_namemax as u32, vfs.f_frsize as u32,
            ),
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty)
    {
        let Some(relative) = self.resolve(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        if let Err(err) = unistd::faccessat(Some(self.mirror_dir()), &relative, mask, 0) {
            reply.error(io_errno(&err));
            return;
        }

        if mask & libc::W_OK != 0 {
            if let Ok(st) = self.stat_relative(&relative) {
                if self.classify_regular(&relative, &st).is_some() {
                    reply.error(libc::EACCES);
                    return;
                }
            }
        }

        reply.ok();
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        flags: i32,
        reply: ReplyCreate,
    )
    {
        let Some(relative) = self.inodes.child_path(parent, name) else {
            reply.error(libc::ENOENT);
            return;
        };

        match fcntl::openat(Some(self.mirror_dir()), &relative, flags | libc::O_CREAT, mode as libc::mode_t) {
            Ok(fd) => match sys_stat::fstat(fd.as_fd()) {
                Ok(st) => {
                    let ino = self.inodes.intern(relative.clone());
                    let attr = make_attr(ino, &st, false, None);
                    let fh = self.handles.insert(Handle {
                        kind: HandleKind::File(fd),
                        relative_name: relative,
                    });
                    reply.created(&TTL, &attr, 0, fh, 0);
                }
                Err(err) => reply.error(io_errno(&err)),
            },
            Err(err) => reply.error(io_errno(&err)),
        }
    }

    fn lseek(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, offset: i64, whence: i32, reply: ReplyLseek)
    {
        let Some(handle) = self.handles.get(fh) else {
            reply.error(libc::EBADF);
            return;
        };

        let fd = match &handle.kind {
            HandleKind::File(fd) | HandleKind::Script(fd) => fd.as_fd(),
            HandleKind::Folder(_) => {
                reply.error(libc::EISDIR);
                return;
            }
        };

        match unistd::lseek(fd, offset, whence) {
            Ok(new_offset) => reply.offset(new_offset),
            Err(err) => reply.error(io_errno(&err)),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn root_ino_is_one()
    {
        assert_eq!(ROOT_INO, 1);
    }

    #[test]
    fn direct_io_bit_matches_fuse_protocol()
    {
        assert_eq!(FOPEN_DIRECT_IO, 1);
    }
}
