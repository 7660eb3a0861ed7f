use {
    crate::retry_on_eintr,
    std::{
        ffi::CString,
        io,
        mem::MaybeUninit,
        os::unix::{ffi::OsStrExt, io::{AsRawFd, BorrowedFd}},
        path::Path,
    },
};

/// Equivalent to [`mkdir`] with [`None`] passed for `dirfd`.
pub fn mkdir(pathname: impl AsRef<Path>, mode: libc::mode_t) -> io::Result<()>
{
    mkdirat(None, pathname, mode)
}

/// Call mkdirat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn mkdirat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    mode:     libc::mode_t,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated.
        let result = unsafe { libc::mkdirat(dirfd, path.as_ptr(), mode) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Equivalent to [`fstatat`] with [`None`] passed for `dirfd`.
pub fn stat(pathname: impl AsRef<Path>) -> io::Result<libc::stat>
{
    fstatat(None, pathname, 0)
}

/// Call fstatat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
/// Pass `libc::AT_SYMLINK_NOFOLLOW` in `flags` to stat the link itself.
pub fn fstatat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    flags:    libc::c_int,
) -> io::Result<libc::stat>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;
    let mut statbuf = MaybeUninit::<libc::stat>::uninit();

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated, statbuf is valid to write into.
        let result = unsafe {
            libc::fstatat(dirfd, path.as_ptr(), statbuf.as_mut_ptr(), flags)
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: fstatat(2) initialized statbuf on success.
        Ok(unsafe { statbuf.assume_init() })
    })
}

/// Call fstat(2) on an already-open file descriptor.
pub fn fstat(fd: BorrowedFd) -> io::Result<libc::stat>
{
    let mut statbuf = MaybeUninit::<libc::stat>::uninit();

    retry_on_eintr(|| {
        // SAFETY: statbuf is valid to write into.
        let result = unsafe { libc::fstat(fd.as_raw_fd(), statbuf.as_mut_ptr()) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: fstat(2) initialized statbuf on success.
        Ok(unsafe { statbuf.assume_init() })
    })
}

/// Equivalent to [`fchmodat`] with [`None`] passed for `dirfd`.
pub fn chmod(pathname: impl AsRef<Path>, mode: libc::mode_t) -> io::Result<()>
{
    fchmodat(None, pathname, mode, 0)
}

/// Call fchmodat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn fchmodat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    mode:     libc::mode_t,
    flags:    libc::c_int,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated.
        let result = unsafe { libc::fchmodat(dirfd, path.as_ptr(), mode, flags) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call fchmod(2) on an already-open file descriptor.
pub fn fchmod(fd: BorrowedFd, mode: libc::mode_t) -> io::Result<()>
{
    retry_on_eintr(|| {
        let result = unsafe { libc::fchmod(fd.as_raw_fd(), mode) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Equivalent to [`utimensat`] with [`None`] passed for `dirfd`.
pub fn utimens(pathname: impl AsRef<Path>, times: &[libc::timespec; 2]) -> io::Result<()>
{
    utimensat(None, pathname, times, 0)
}

/// Call utimensat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn utimensat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    times:    &[libc::timespec; 2],
    flags:    libc::c_int,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated, times points to two initialized
        //         timespecs.
        let result = unsafe {
            libc::utimensat(dirfd, path.as_ptr(), times.as_ptr(), flags)
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call futimens(2) on an already-open file descriptor.
pub fn futimens(fd: BorrowedFd, times: &[libc::timespec; 2]) -> io::Result<()>
{
    retry_on_eintr(|| {
        // SAFETY: times points to two initialized timespecs.
        let result = unsafe { libc::futimens(fd.as_raw_fd(), times.as_ptr()) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call mknodat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn mknodat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    mode:     libc::mode_t,
    dev:      libc::dev_t,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated.
        let result = unsafe { libc::mknodat(dirfd, path.as_ptr(), mode, dev) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}
