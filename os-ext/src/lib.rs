//! Thin, allocation-conscious wrappers around POSIX system calls.
//!
//! All wrappers that accept a pathname take `impl AsRef<Path>` and convert
//! internally; all wrappers that create a new file descriptor set
//! `O_CLOEXEC` on it implicitly. Every wrapper retries automatically on
//! `EINTR`.

use std::io;

pub mod dirent;
pub mod fcntl;
pub mod process;
pub mod stdio;
pub mod stdlib;
pub mod sys_stat;
pub mod sys_statvfs;
pub mod unistd;

/// Repeatedly calls `f` as long as it fails with `EINTR`.
pub fn retry_on_eintr<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T>
{
    loop {
        match f() {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}
