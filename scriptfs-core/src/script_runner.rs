//! Producing a script's output into an anonymous temporary file.

use {
    crate::{
        error::{Error, Result},
        executor::Executor,
        procedure::{Procedure, Program},
    },
    os_ext::{fcntl, stdlib, sys_stat, unistd},
    std::{
        ffi::CString,
        os::unix::{
            ffi::OsStrExt,
            io::{AsFd, BorrowedFd, OwnedFd},
        },
        path::Path,
    },
};

/// Render a fresh anonymous temp file from `temp_template`, unlink it
/// immediately, and return only the open descriptor.
fn create_anonymous_temp(temp_template: &Path) -> Result<OwnedFd>
{
    let (fd, path) = stdlib::mkstemp(temp_template)?;
    unistd::unlink(&path)?;
    Ok(fd)
}

/// Copy `source` (opened relative to `mirror_dir`) into a fresh,
/// named temp file, preserving owner read and execute bits, and return
/// its path. The caller is responsible for removing the copy once it is
/// no longer needed (typically right after exec-ing it by fd).
fn temp_copy(
    mirror_dir: BorrowedFd,
    temp_template: &Path,
    source: &Path,
) -> Result<std::path::PathBuf>
{
    let src_fd = fcntl::openat(Some(mirror_dir), source, libc::O_RDONLY, 0)?;
    let src_stat = sys_stat::fstat(src_fd.as_fd())?;

    let (dst_fd, dst_path) = stdlib::mkstemp(temp_template)?;

    let mut buf = [0u8; 0x1000];
    loop {
        let n = unistd::read(src_fd.as_fd(), &mut buf)?;
        if n == 0 {
            break;
        }
        let mut written = 0;
        while written < n {
            written += unistd::write(dst_fd.as_fd(), &buf[written..n])?;
        }
    }

    let mode = (src_stat.st_mode as libc::mode_t) & (libc::S_IRUSR | libc::S_IXUSR);
    sys_stat::fchmod(dst_fd.as_fd(), mode)?;
    drop(dst_fd);

    Ok(dst_path)
}

/// Produce `relative`'s output under `procedure` into a fresh, unlinked
/// temp file, returning the descriptor positioned at offset 0.
pub fn run_script(
    mirror_dir: BorrowedFd,
    envp: &[CString],
    temp_template: &Path,
    relative: &Path,
    procedure: &Procedure,
) -> Result<OwnedFd>
{
    let out_fd = create_anonymous_temp(temp_template)?;
    let executor = Executor::new(mirror_dir, envp);

    let status = match &procedure.program {
        Program::InterpretShell => {
            let copy_path = temp_copy(mirror_dir, temp_template, relative)?;
            // The copy is a real directory entry purely so it can be
            // opened and exec-by-fd'd; unlink it immediately afterward.
            let result = (|| {
                let argv = [CString::new(copy_path.as_os_str().as_bytes())
                    .map_err(|_| Error::Io(std::io::Error::from_raw_os_error(libc::EINVAL)))?];
                executor.execute(&argv, Some(out_fd.as_fd()), None)
            })();
            let _ = unistd::unlink(&copy_path);
            result?
        }
        Program::ExternalFilter(invocation) => {
            let argv = invocation.build_argv(relative);
            let stdin_source = invocation.feed_stdin.then_some(relative);
            executor.execute(&argv, Some(out_fd.as_fd()), stdin_source)?
        }
    };

    if !status.success() {
        log::debug!("run_script: procedure exited with {:?}", status);
    }

    Ok(out_fd)
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        crate::procedure::Test,
        std::os::unix::fs::PermissionsExt,
    };

    fn temp_dir_fd() -> (std::path::PathBuf, OwnedFd)
    {
        let template = format!("{}/sfs-runner-test.XXXXXX", std::env::temp_dir().display());
        let dir = stdlib::mkdtemp(template).unwrap();
        let fd = fcntl::openat(None, &dir, libc::O_RDONLY | libc::O_DIRECTORY, 0).unwrap();
        (dir, fd)
    }

    fn env() -> Vec<CString>
    {
        std::env::vars_os()
            .map(|(k, v)| {
                let mut s = k;
                s.push("=");
                s.push(v);
                CString::new(s.as_os_str().as_bytes()).unwrap()
            })
            .collect()
    }

    #[test]
    fn interpret_shell_runs_script_and_captures_stdout()
    {
        let (dir, dir_fd) = temp_dir_fd();
        let script_path = dir.join("greet.sh");
        std::fs::write(&script_path, b"#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let template = format!("{}/sfs-runner-test.XXXXXX", std::env::temp_dir().display());
        let procedure = Procedure { test: Test::Shebang, program: Program::InterpretShell };
        let envp = env();

        let out_fd = run_script(
            dir_fd.as_fd(),
            &envp,
            Path::new(&template),
            Path::new("greet.sh"),
            &procedure,
        ).unwrap();

        unistd::lseek(out_fd.as_fd(), 0, libc::SEEK_SET).unwrap();
        let mut buf = [0u8; 64];
        let n = unistd::read(out_fd.as_fd(), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"hi\n");
    }
}
