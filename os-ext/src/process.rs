//! Process creation, execution, and reaping.

use {
    crate::retry_on_eintr,
    std::{
        convert::Infallible,
        ffi::{CStr, CString},
        io,
        os::unix::io::{AsRawFd, BorrowedFd},
    },
};

/// The outcome of a successfully-forked child, observed by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus
{
    /// The child exited normally, carrying its exit code.
    Exited(libc::c_int),

    /// The child was killed by a signal.
    Signaled(libc::c_int),
}

impl ExitStatus
{
    /// Whether the process exited with status zero.
    pub fn success(self) -> bool
    {
        matches!(self, ExitStatus::Exited(0))
    }

    fn from_wait_status(status: libc::c_int) -> Self
    {
        if libc::WIFSIGNALED(status) {
            ExitStatus::Signaled(libc::WTERMSIG(status))
        } else {
            ExitStatus::Exited(libc::WEXITSTATUS(status))
        }
    }
}

/// Result of [`fork`]: which side of the fork this call returned on.
pub enum ForkResult
{
    /// Returned in the parent process; carries the child's pid.
    Parent(libc::pid_t),

    /// Returned in the child process.
    Child,
}

/// Call fork(2).
///
/// # Safety
///
/// Between the call to `fork` and either `exec`-ing or `_exit`-ing, the
/// child process may only call functions that are async-signal-safe;
/// in particular it must not allocate, lock a mutex, or touch most of
/// the Rust standard library's buffered I/O.
pub unsafe fn fork() -> io::Result<ForkResult>
{
    let pid = unsafe { libc::fork() };

    if pid == -1 {
        return Err(io::Error::last_os_error());
    }

    if pid == 0 {
        Ok(ForkResult::Child)
    } else {
        Ok(ForkResult::Parent(pid))
    }
}

/// Wait for a specific child process to change state, returning its exit
/// status once it has terminated.
pub fn waitpid(pid: libc::pid_t) -> io::Result<ExitStatus>
{
    let mut status: libc::c_int = 0;

    retry_on_eintr(|| {
        let result = unsafe { libc::waitpid(pid, &mut status, 0) };

        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    })?;

    Ok(ExitStatus::from_wait_status(status))
}

/// Send a signal to a process.
pub fn kill(pid: libc::pid_t, signal: libc::c_int) -> io::Result<()>
{
    let result = unsafe { libc::kill(pid, signal) };

    if result == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Call execve(2), replacing the calling process image.
///
/// On success this function never returns.
/// `argv` and `envp` must not contain interior NULs; the caller is
/// responsible for NUL-terminating them, which this function does not do
/// on the caller's behalf since both are typically built once and reused.
pub fn execve(
    pathname: &CStr,
    argv:     &[*const libc::c_char],
    envp:     &[*const libc::c_char],
) -> io::Result<Infallible>
{
    // SAFETY: pathname is NUL-terminated; argv and envp are NULL-terminated
    //         pointer arrays, as required by execve(2).
    unsafe { libc::execve(pathname.as_ptr(), argv.as_ptr(), envp.as_ptr()) };

    Err(io::Error::last_os_error())
}

/// Call fexecve(2): execve(2) by file descriptor instead of by path.
///
/// Used to execute an already-open, already-validated file without the
/// TOCTOU exposure of re-resolving a pathname right before exec.
/// On success this function never returns.
pub fn fexecve(
    fd:   BorrowedFd,
    argv: &[*const libc::c_char],
    envp: &[*const libc::c_char],
) -> io::Result<Infallible>
{
    // SAFETY: argv and envp are NULL-terminated pointer arrays, as
    //         required by fexecve(2).
    unsafe { libc::fexecve(fd.as_raw_fd(), argv.as_ptr(), envp.as_ptr()) };

    Err(io::Error::last_os_error())
}

/// Build a NUL-terminated `argv`/`envp`-style pointer array from owned
/// [`CString`]s, suitable for passing to [`execve`] or [`fexecve`].
///
/// The returned vector of [`CString`]s must be kept alive for as long as
/// the pointer array (the second element of the returned tuple) is used.
pub fn build_exec_argv(strings: &[CString]) -> Vec<*const libc::c_char>
{
    let mut argv: Vec<*const libc::c_char> =
        strings.iter().map(|s| s.as_ptr()).collect();
    argv.push(std::ptr::null());
    argv
}
