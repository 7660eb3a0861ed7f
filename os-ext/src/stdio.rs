use {
    crate::retry_on_eintr,
    std::{
        ffi::CString,
        io,
        os::unix::{ffi::OsStrExt, io::{AsRawFd, BorrowedFd}},
        path::Path,
    },
};

/// Equivalent to [`renameat2`] with [`None`] passed for both directory fds
/// and no flags.
pub fn rename(oldpath: impl AsRef<Path>, newpath: impl AsRef<Path>) -> io::Result<()>
{
    renameat2(None, oldpath, None, newpath, 0)
}

/// Call renameat2(2) with the given arguments.
///
/// If either `dirfd` is [`None`], `AT_FDCWD` is passed for it.
/// Pass `libc::RENAME_NOREPLACE` in `flags` to fail instead of
/// silently replacing an existing `newpath`.
pub fn renameat2(
    olddirfd: Option<BorrowedFd>,
    oldpath:  impl AsRef<Path>,
    newdirfd: Option<BorrowedFd>,
    newpath:  impl AsRef<Path>,
    flags:    libc::c_uint,
) -> io::Result<()>
{
    let olddirfd = olddirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let newdirfd = newdirfd.map(|fd| fd.as_raw_fd()).unwrap_or(libc::AT_FDCWD);
    let oldpath = CString::new(oldpath.as_ref().as_os_str().as_bytes())?;
    let newpath = CString::new(newpath.as_ref().as_os_str().as_bytes())?;

    retry_on_eintr(|| {
        // SAFETY: both paths are NUL-terminated.
        let result = unsafe {
            libc::syscall(
                libc::SYS_renameat2,
                olddirfd,
                oldpath.as_ptr(),
                newdirfd,
                newpath.as_ptr(),
                flags,
            )
        };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })
}
