//! Reading directory entries.

use {
    std::{
        ffi::CStr,
        io,
        os::unix::io::{IntoRawFd, OwnedFd},
        ptr::NonNull,
    },
};

/// An open directory stream, as created by [`fdopendir`].
///
/// Closing the stream also closes the underlying file descriptor;
/// the descriptor passed to [`fdopendir`] must not be used afterwards.
pub struct Dir(NonNull<libc::DIR>);

// SAFETY: DIR streams may be moved between threads, so long as access is
//         not concurrent, which Rust's aliasing rules already guarantee.
unsafe impl Send for Dir {}

impl Dir
{
    /// Open a directory stream on an already-open directory file descriptor.
    ///
    /// Takes ownership of `fd`; the stream owns it from here on.
    pub fn fdopendir(fd: OwnedFd) -> io::Result<Self>
    {
        let raw_fd = fd.into_raw_fd();

        // SAFETY: raw_fd is a valid, open file descriptor that we are
        //         relinquishing ownership of to the new DIR stream.
        let dir = unsafe { libc::fdopendir(raw_fd) };

        match NonNull::new(dir) {
            Some(dir) => Ok(Self(dir)),
            None => {
                let err = io::Error::last_os_error();
                // SAFETY: raw_fd is still open since fdopendir(3) failed.
                unsafe { libc::close(raw_fd); }
                Err(err)
            }
        }
    }

    /// Read the next directory entry.
    ///
    /// Returns [`None`] once the stream is exhausted.
    pub fn readdir(&mut self) -> io::Result<Option<DirEntry>>
    {
        // SAFETY: readdir(3) is not reentrant, but &mut self ensures
        //         exclusive access to this stream for the call's duration.
        // errno must be cleared first to distinguish end-of-stream from
        // an actual error, since both cases return NULL.
        unsafe { *libc::__errno_location() = 0; }
        let entry = unsafe { libc::readdir(self.0.as_ptr()) };

        if entry.is_null() {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return if errno == 0 {
                Ok(None)
            } else {
                Err(io::Error::from_raw_os_error(errno))
            };
        }

        // SAFETY: entry is non-null and was just returned by readdir(3);
        //         d_name is NUL-terminated.
        let name = unsafe { CStr::from_ptr((*entry).d_name.as_ptr()) }.to_owned();
        let ino = unsafe { (*entry).d_ino };
        let d_type = unsafe { (*entry).d_type };

        Ok(Some(DirEntry { name, ino, d_type }))
    }

    /// Return the file descriptor underlying this stream, without
    /// transferring ownership. Do not close it directly.
    pub fn as_raw_fd(&self) -> libc::c_int
    {
        // SAFETY: self.0 points to a live DIR stream.
        unsafe { libc::dirfd(self.0.as_ptr()) }
    }
}

impl Drop for Dir
{
    fn drop(&mut self)
    {
        // SAFETY: self.0 points to a live DIR stream, not used again.
        unsafe { libc::closedir(self.0.as_ptr()); }
    }
}

/// One entry returned by [`Dir::readdir`].
#[derive(Debug, Clone)]
pub struct DirEntry
{
    /// Entry name, as returned by the kernel (not necessarily valid UTF-8).
    pub name: std::ffi::CString,

    /// Inode number of the entry, as seen from the backing filesystem.
    pub ino: libc::ino_t,

    /// Entry type hint (`DT_DIR`, `DT_REG`, ... or `DT_UNKNOWN`).
    ///
    /// Some filesystems never populate this field; callers that need a
    /// reliable type should fall back to `fstatat` when it is `DT_UNKNOWN`.
    pub d_type: u8,
}

/// Rewind a directory stream's position to the beginning.
pub fn rewinddir(dir: &mut Dir)
{
    // SAFETY: dir.0 points to a live DIR stream.
    unsafe { libc::rewinddir(dir.0.as_ptr()); }
}
