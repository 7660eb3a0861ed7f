use {
    crate::retry_on_eintr,
    std::{
        ffi::{CString, OsString},
        io,
        os::unix::{
            ffi::{OsStrExt, OsStringExt},
            io::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
        },
        path::{Path, PathBuf},
    },
};

/// Equivalent to [`readlink`] with [`None`] passed for `dirfd`.
pub fn readlink(pathname: impl AsRef<Path>) -> io::Result<PathBuf>
{
    readlinkat(None, pathname)
}

/// Call readlinkat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
///
/// readlinkat(2) truncates the target if it does not fit into the buffer.
/// When this happens, the wrapper function automatically retries the call
/// with a bigger buffer, until it fits.
pub fn readlinkat(dirfd: Option<BorrowedFd>, pathname: impl AsRef<Path>)
    -> io::Result<PathBuf>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let pathname = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    // NOTE: When changing the initial buffer size,
    //       adjust sizes of symlinks in testdata.
    let mut buf: Vec<u8> = Vec::with_capacity(256);

    retry_on_eintr(|| {
        loop {
            // SAFETY: pathname is NUL-terminated, buffer size is correct.
            let len = unsafe {
                libc::readlinkat(
                    dirfd,
                    pathname.as_ptr(),
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.capacity(),
                )
            };

            if len == -1 {
                return Err(io::Error::last_os_error());
            }

            // SAFETY: readlinkat(2) wrote this many bytes.
            unsafe { buf.set_len(len as usize); }

            if buf.len() == buf.capacity() {
                // There may have been a truncation.
                // Grow the buffer and try again.
                buf.reserve(1);
                continue;
            }

            buf.shrink_to_fit();
            break Ok(());
        }
    })?;

    Ok(PathBuf::from(OsString::from_vec(buf)))
}

/// Equivalent to [`faccessat`] with [`None`] passed for `dirfd` and `flags`.
pub fn access(pathname: impl AsRef<Path>, mode: libc::c_int) -> io::Result<()>
{
    faccessat(None, pathname, mode, 0)
}

/// Call faccessat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn faccessat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    mode:     libc::c_int,
    flags:    libc::c_int,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let pathname = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: pathname is NUL-terminated.
        let result = unsafe {
            libc::faccessat(dirfd, pathname.as_ptr(), mode, flags)
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Equivalent to [`unlinkat`] with [`None`] passed for `dirfd` and no flags.
pub fn unlink(pathname: impl AsRef<Path>) -> io::Result<()>
{
    unlinkat(None, pathname, 0)
}

/// Call unlinkat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
/// Pass `libc::AT_REMOVEDIR` in `flags` to remove a directory instead.
pub fn unlinkat(
    dirfd:    Option<BorrowedFd>,
    pathname: impl AsRef<Path>,
    flags:    libc::c_int,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let pathname = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: pathname is NUL-terminated.
        let result = unsafe { libc::unlinkat(dirfd, pathname.as_ptr(), flags) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Equivalent to [`symlinkat`] with [`None`] passed for `dirfd`.
pub fn symlink(target: impl AsRef<Path>, linkpath: impl AsRef<Path>) -> io::Result<()>
{
    symlinkat(target, None, linkpath)
}

/// Call symlinkat(2) with the given arguments.
///
/// If `dirfd` is [`None`], `AT_FDCWD` is passed.
pub fn symlinkat(
    target:   impl AsRef<Path>,
    dirfd:    Option<BorrowedFd>,
    linkpath: impl AsRef<Path>,
) -> io::Result<()>
{
    let dirfd = dirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let target = CString::new(target.as_ref().as_os_str().as_bytes())?;
    let linkpath = CString::new(linkpath.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: both paths are NUL-terminated.
        let result = unsafe {
            libc::symlinkat(target.as_ptr(), dirfd, linkpath.as_ptr())
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Equivalent to [`linkat`] with [`None`] passed for both directory fds.
pub fn link(oldpath: impl AsRef<Path>, newpath: impl AsRef<Path>) -> io::Result<()>
{
    linkat(None, oldpath, None, newpath, 0)
}

/// Call linkat(2) with the given arguments.
///
/// If either `dirfd` is [`None`], `AT_FDCWD` is passed for it.
pub fn linkat(
    olddirfd: Option<BorrowedFd>,
    oldpath:  impl AsRef<Path>,
    newdirfd: Option<BorrowedFd>,
    newpath:  impl AsRef<Path>,
    flags:    libc::c_int,
) -> io::Result<()>
{
    let olddirfd = olddirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let newdirfd = newdirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let oldpath = CString::new(oldpath.as_ref().as_os_str().as_bytes())?;
    let newpath = CString::new(newpath.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: both paths are NUL-terminated.
        let result = unsafe {
            libc::linkat(olddirfd, oldpath.as_ptr(), newdirfd, newpath.as_ptr(), flags)
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call close(2) on an owned file descriptor.
///
/// This is rarely needed explicitly, since dropping an [`OwnedFd`]
/// already closes it; it exists for call sites that need to observe
/// the close(2) error, which dropping silently discards.
pub fn close(fd: OwnedFd) -> io::Result<()>
{
    let fd = fd.as_raw_fd();
    // SAFETY: fd is open and we take ownership via from_raw_fd below,
    //         which is never done since the underlying descriptor is
    //         closed regardless of the outcome of the syscall.
    let result = unsafe { libc::close(fd) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Call read(2) into `buf`, returning the number of bytes read.
pub fn read(fd: BorrowedFd, buf: &mut [u8]) -> io::Result<usize>
{
    retry_on_eintr(|| {
        // SAFETY: buf is valid for buf.len() bytes.
        let n = unsafe {
            libc::read(fd.as_raw_fd(), buf.as_mut_ptr() as *mut libc::c_void, buf.len())
        };

        if n == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    })
}

/// Call write(2) with `buf`, returning the number of bytes written.
pub fn write(fd: BorrowedFd, buf: &[u8]) -> io::Result<usize>
{
    retry_on_eintr(|| {
        // SAFETY: buf is valid for buf.len() bytes.
        let n = unsafe {
            libc::write(fd.as_raw_fd(), buf.as_ptr() as *const libc::c_void, buf.len())
        };

        if n == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    })
}

/// Call lseek(2) with the given arguments.
pub fn lseek(fd: BorrowedFd, offset: libc::off_t, whence: libc::c_int)
    -> io::Result<libc::off_t>
{
    retry_on_eintr(|| {
        let result = unsafe { libc::lseek(fd.as_raw_fd(), offset, whence) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(result)
    })
}

/// Call truncate(2), setting the size of the file named by `pathname`.
pub fn truncate(pathname: impl AsRef<Path>, length: libc::off_t) -> io::Result<()>
{
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        let result = unsafe { libc::truncate(path.as_ptr(), length) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call ftruncate(2), setting the size of an already-open file descriptor.
pub fn ftruncate(fd: BorrowedFd, length: libc::off_t) -> io::Result<()>
{
    retry_on_eintr(|| {
        let result = unsafe { libc::ftruncate(fd.as_raw_fd(), length) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Call fsync(2) on an already-open file descriptor.
pub fn fsync(fd: BorrowedFd) -> io::Result<()>
{
    retry_on_eintr(|| {
        let result = unsafe { libc::fsync(fd.as_raw_fd()) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

/// Create a pipe, returning `(read_end, write_end)`.
///
/// Both ends are created with `O_CLOEXEC` set.
pub fn pipe() -> io::Result<(OwnedFd, OwnedFd)>
{
    let mut fds = [0 as libc::c_int; 2];

    retry_on_eintr(|| {
        // SAFETY: fds points to space for two ints.
        let result = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })?;

    // SAFETY: pipe2(2) returned these as new, open file descriptors.
    unsafe { Ok((OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))) }
}

/// Call dup2(2), duplicating `oldfd` onto `newfd`.
///
/// Unlike most wrappers in this crate, the duplicate does *not* have
/// `O_CLOEXEC` set, since dup2(2) is predominantly used right before an
/// exec to set up a child's standard streams.
pub fn dup2(oldfd: BorrowedFd, newfd: libc::c_int) -> io::Result<()>
{
    retry_on_eintr(|| {
        let result = unsafe { libc::dup2(oldfd.as_raw_fd(), newfd) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn readlinkat_loop()
    {
        for len in [10, 255, 256, 257, 512] {
            let expected: String = "0123456789".chars().cycle().take(len).collect();
            let symlink = format!("testdata/{}-byte-symlink", len);
            let actual = readlinkat(None, symlink).unwrap();
            assert_eq!(actual, PathBuf::from(expected));
        }
    }
}
