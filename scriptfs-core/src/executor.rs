//! Forking a child, wiring its stdin/stdout, and awaiting its exit status.

use {
    crate::{error::Error, shebang},
    os_ext::{process, unistd},
    std::{
        ffi::CString,
        os::unix::io::{AsFd, BorrowedFd, OwnedFd},
        path::Path,
    },
};

/// Runs external programs on behalf of the Test Evaluator and Script
/// Runner, relative to a fixed mirror directory and environment.
pub struct Executor<'a>
{
    mirror_dir: BorrowedFd<'a>,
    envp: &'a [CString],
}

impl<'a> Executor<'a>
{
    pub fn new(mirror_dir: BorrowedFd<'a>, envp: &'a [CString]) -> Self
    {
        Self { mirror_dir, envp }
    }

    /// Fork a child that execs `argv[0]` (resolved relative to the
    /// mirror, following the shebang launcher's rules) with `argv`.
    ///
    /// If `out_fd` is given, the child's stdout is redirected to it;
    /// otherwise the child's stdout is redirected to stderr, so that a
    /// program run purely for its exit status (a *program*-type test)
    /// cannot contaminate the parent's own stdout.
    ///
    /// If `stdin_source` is given, the named mirror-relative file's
    /// bytes are streamed to the child's stdin through a pipe; otherwise
    /// the child's stdin is closed.
    pub fn execute(
        &self,
        argv: &[CString],
        out_fd: Option<BorrowedFd>,
        stdin_source: Option<&Path>,
    ) -> Result<process::ExitStatus, Error>
    {
        let pipe = match stdin_source {
            Some(_) => Some(unistd::pipe()?),
            None => None,
        };

        // SAFETY: the child only calls async-signal-safe-equivalent
        // operations before exec: dup2, close, and the shebang launcher's
        // openat/exec sequence. No other thread in this process holds a
        // lock the child would need, matching the original implementation's
        // fork discipline.
        match unsafe { process::fork() }.map_err(Error::Fork)? {
            process::ForkResult::Child => {
                self.run_child(argv, out_fd, pipe);
                unreachable!("run_child never returns");
            }
            process::ForkResult::Parent(pid) => {
                self.run_parent(pid, pipe, stdin_source)
            }
        }
    }

    fn run_parent(
        &self,
        pid: libc::pid_t,
        pipe: Option<(OwnedFd, OwnedFd)>,
        stdin_source: Option<&Path>,
    ) -> Result<process::ExitStatus, Error>
    {
        scope_exit::scope_exit!(_reap, {
            let _ = process::kill(pid, libc::SIGKILL);
            let _ = process::waitpid(pid);
        });

        if let (Some((read_end, write_end)), Some(source)) = (pipe, stdin_source) {
            drop(read_end);
            self.feed_stdin(write_end, source)?;
        }

        let status = process::waitpid(pid)?;
        _reap.forget();
        Ok(status)
    }

    fn feed_stdin(&self, write_end: OwnedFd, source: &Path) -> Result<(), Error>
    {
        let in_fd = os_ext::fcntl::openat(
            Some(self.mirror_dir), source, libc::O_RDONLY, 0,
        );

        let in_fd = match in_fd {
            Ok(fd) => fd,
            Err(_) => {
                // Matches the original: if the source cannot be opened,
                // the pipe is simply closed with nothing written, and the
                // child sees EOF on stdin immediately.
                return Ok(());
            }
        };

        let mut buf = [0u8; 0x1000];
        loop {
            let n = unistd::read(in_fd.as_fd(), &mut buf)?;
            if n == 0 {
                break;
            }

            let mut written = 0;
            while written < n {
                written += unistd::write(write_end.as_fd(), &buf[written..n])?;
            }
        }

        // SAFETY: fsync only needs a valid fd; write_end is open until
        // dropped just below.
        unsafe { libc::fsync(std::os::unix::io::AsRawFd::as_raw_fd(&write_end)); }

        Ok(())
    }

    fn run_child(
        &self,
        argv: &[CString],
        out_fd: Option<BorrowedFd>,
        pipe: Option<(OwnedFd, OwnedFd)>,
    ) -> !
    {
        match out_fd {
            Some(fd) => { let _ = unistd::dup2(fd, libc::STDOUT_FILENO); }
            None => { let _ = unistd::dup2(
                // SAFETY: fd 2 (stderr) is always open in this process.
                unsafe { BorrowedFd::borrow_raw(libc::STDERR_FILENO) },
                libc::STDOUT_FILENO,
            ); }
        }

        match pipe {
            Some((read_end, write_end)) => {
                drop(write_end);
                let _ = unistd::dup2(read_end.as_fd(), libc::STDIN_FILENO);
            }
            None => {
                // SAFETY: fd 0 may already be closed; close(2) on a
                // closed fd is a harmless EBADF.
                unsafe { libc::close(libc::STDIN_FILENO); }
            }
        }

        let target = Path::new(argv[0].to_str().unwrap_or("."));
        let _ = shebang::launch(self.mirror_dir, target, argv, self.envp);

        // exec failed; report and die, matching the original's
        // fprintf-then-abort diagnostic path.
        eprintln!("scriptfs: exec of {:?} failed", target);
        std::process::exit(127);
    }
}
