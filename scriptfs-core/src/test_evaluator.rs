//! Deciding whether a mirror-relative file is a script, and by which
//! procedure.

use {
    crate::{
        executor::Executor,
        procedure::{Invocation, Procedure, Registry, Test},
    },
    os_ext::{fcntl, unistd},
    std::{
        ffi::CString,
        os::unix::io::{AsFd, BorrowedFd},
        path::Path,
    },
};

/// Evaluate the registry against `relative`, in order, returning the first
/// matching procedure.
///
/// Tests are evaluated strictly in registration order; the first test that
/// returns true wins, regardless of how many later tests would also have
/// matched. This makes classification a pure function of the registry's
/// order: inserting a procedure later can never change the outcome for a
/// file already claimed by an earlier one.
pub fn classify<'a>(
    mirror_dir: BorrowedFd,
    envp: &[CString],
    registry: &'a Registry,
    relative: &Path,
) -> Option<&'a Procedure>
{
    registry.iter().find(|proc| evaluate(mirror_dir, envp, &proc.test, relative))
}

fn evaluate(mirror_dir: BorrowedFd, envp: &[CString], test: &Test, relative: &Path) -> bool
{
    match test {
        Test::AlwaysTrue => true,
        Test::AlwaysFalse => false,
        Test::Shebang => has_shebang(mirror_dir, relative),
        Test::Executable => is_executable(mirror_dir, relative),
        Test::ShebangOrExecutable => {
            has_shebang(mirror_dir, relative) || is_executable(mirror_dir, relative)
        }
        Test::Regex(re) => re.is_match(relative.as_os_str().as_encoded_bytes()),
        Test::Program(invocation) => run_program_test(mirror_dir, envp, invocation, relative),
    }
}

/// Read exactly the first two bytes of `relative` and check for `#!`.
fn has_shebang(mirror_dir: BorrowedFd, relative: &Path) -> bool
{
    let fd = match fcntl::openat(Some(mirror_dir), relative, libc::O_RDONLY, 0) {
        Ok(fd) => fd,
        Err(_) => return false,
    };

    let mut buf = [0u8; 2];
    let mut read_total = 0;
    while read_total < buf.len() {
        match unistd::read(fd.as_fd(), &mut buf[read_total..]) {
            Ok(0) => break,
            Ok(n) => read_total += n,
            Err(_) => return false,
        }
    }

    read_total == 2 && &buf == b"#!"
}

fn is_executable(mirror_dir: BorrowedFd, relative: &Path) -> bool
{
    unistd::faccessat(Some(mirror_dir), relative, libc::X_OK, 0).is_ok()
}

fn run_program_test(
    mirror_dir: BorrowedFd,
    envp: &[CString],
    invocation: &Invocation,
    relative: &Path,
) -> bool
{
    let argv = invocation.build_argv(relative);
    let stdin_source = invocation.feed_stdin.then_some(relative);

    let executor = Executor::new(mirror_dir, envp);
    match executor.execute(&argv, None, stdin_source) {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests
{
    use {
        super::*,
        crate::procedure::Program,
        os_ext::stdlib,
        std::os::unix::{fs::PermissionsExt, io::AsFd},
    };

    fn temp_dir() -> (std::path::PathBuf, std::fs::File)
    {
        let template = format!("{}/sfs-eval-test.XXXXXX", std::env::temp_dir().display());
        let dir = stdlib::mkdtemp(template).unwrap();
        let fd = fcntl::openat(None, &dir, libc::O_RDONLY | libc::O_DIRECTORY, 0).unwrap();
        (dir, std::fs::File::from(fd))
    }

    #[test]
    fn shebang_detection()
    {
        let (dir, dir_file) = temp_dir();
        std::fs::write(dir.join("a"), b"#!/bin/sh\necho hi\n").unwrap();
        std::fs::write(dir.join("b"), b"not a script\n").unwrap();

        assert!(has_shebang(dir_file.as_fd(), Path::new("a")));
        assert!(!has_shebang(dir_file.as_fd(), Path::new("b")));
    }

    #[test]
    fn executable_detection()
    {
        let (dir, dir_file) = temp_dir();
        std::fs::write(dir.join("exe"), b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(dir.join("exe"), std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.join("plain"), b"hi\n").unwrap();

        assert!(is_executable(dir_file.as_fd(), Path::new("exe")));
        assert!(!is_executable(dir_file.as_fd(), Path::new("plain")));
    }

    #[test]
    fn classify_first_match_wins()
    {
        let (dir, dir_file) = temp_dir();
        std::fs::write(dir.join("a.json"), b"{}").unwrap();

        let mut registry = Registry::new();
        registry.push(Procedure {
            test: Test::Regex(regex::bytes::Regex::new(r"\.json$").unwrap()),
            program: Program::InterpretShell,
        });
        registry.push(Procedure { test: Test::AlwaysTrue, program: Program::InterpretShell });

        let matched = classify(dir_file.as_fd(), &[], &registry, Path::new("a.json"));
        assert!(matches!(matched.unwrap().test, Test::Regex(_)));
    }
}
