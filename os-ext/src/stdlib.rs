//! Creating uniquely-named temporary files and directories.

use std::{
    ffi::{CString, OsString},
    io,
    os::unix::{
        ffi::{OsStrExt, OsStringExt},
        io::{FromRawFd, OwnedFd},
    },
    path::{Path, PathBuf},
};

/// Create and open an anonymous temporary file from a `template` ending in
/// `XXXXXX`, returning the file descriptor and the path it was created at.
///
/// The returned path names a real directory entry; callers that want an
/// unlinked, anonymous temp file (as used for script materialization)
/// should `unlink` it immediately after this call succeeds.
pub fn mkstemp(template: impl AsRef<Path>) -> io::Result<(OwnedFd, PathBuf)>
{
    let mut buf = CString::new(template.as_ref().as_os_str().as_bytes())?
        .into_bytes_with_nul();

    // SAFETY: buf is a mutable, NUL-terminated buffer ending in "XXXXXX",
    //         as required by mkstemp(3).
    let fd = unsafe { libc::mkstemp(buf.as_mut_ptr() as *mut libc::c_char) };

    if fd == -1 {
        return Err(io::Error::last_os_error());
    }

    buf.pop(); // drop the NUL terminator mkstemp(3) left in place
    let path = PathBuf::from(OsString::from_vec(buf));

    // SAFETY: fd is a new, open file descriptor.
    Ok((unsafe { OwnedFd::from_raw_fd(fd) }, path))
}

/// Create a uniquely-named temporary directory from a `template` ending in
/// `XXXXXX`, returning the path it was created at.
pub fn mkdtemp(template: impl AsRef<Path>) -> io::Result<PathBuf>
{
    let mut buf = CString::new(template.as_ref().as_os_str().as_bytes())?
        .into_bytes_with_nul();

    // SAFETY: buf is a mutable, NUL-terminated buffer ending in "XXXXXX",
    //         as required by mkdtemp(3).
    let result = unsafe { libc::mkdtemp(buf.as_mut_ptr() as *mut libc::c_char) };

    if result.is_null() {
        return Err(io::Error::last_os_error());
    }

    buf.pop();
    Ok(PathBuf::from(OsString::from_vec(buf)))
}
