//! Filesystem-wide statistics.

use {
    crate::retry_on_eintr,
    std::{
        ffi::CString,
        io,
        mem::MaybeUninit,
        os::unix::{ffi::OsStrExt, io::AsRawFd, io::BorrowedFd},
        path::Path,
    },
};

/// Call statvfs(3) on a pathname.
pub fn statvfs(pathname: impl AsRef<Path>) -> io::Result<libc::statvfs>
{
    let path = CString::new(pathname.as_ref().as_os_str().as_bytes())?;
    let mut buf = MaybeUninit::<libc::statvfs>::uninit();

    retry_on_eintr(|| {
        // SAFETY: path is NUL-terminated, buf is valid to write into.
        let result = unsafe { libc::statvfs(path.as_ptr(), buf.as_mut_ptr()) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: statvfs(3) initialized buf on success.
        Ok(unsafe { buf.assume_init() })
    })
}

/// Call fstatvfs(3) on an already-open file descriptor.
pub fn fstatvfs(fd: BorrowedFd) -> io::Result<libc::statvfs>
{
    let mut buf = MaybeUninit::<libc::statvfs>::uninit();

    retry_on_eintr(|| {
        // SAFETY: buf is valid to write into.
        let result = unsafe { libc::fstatvfs(fd.as_raw_fd(), buf.as_mut_ptr()) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: fstatvfs(3) initialized buf on success.
        Ok(unsafe { buf.assume_init() })
    })
}
