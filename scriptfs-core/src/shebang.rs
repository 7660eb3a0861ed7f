//! Parsing a `#!` line and launching either the named interpreter or the
//! target itself.

use {
    os_ext::{fcntl, process, unistd},
    std::{
        convert::Infallible,
        ffi::CString,
        io,
        os::unix::{
            ffi::OsStrExt,
            io::{AsFd, BorrowedFd, OwnedFd},
        },
        path::Path,
    },
};

/// Open `relative` through `mirror_dir`; if that fails, fall back to
/// opening it as an absolute path directly, so that interpreters and
/// filter programs that live on the host outside the mirror still work.
///
/// Resolution never falls back to a `PATH` search.
fn open_with_fallback(mirror_dir: BorrowedFd, relative: &Path) -> io::Result<OwnedFd>
{
    match fcntl::openat(Some(mirror_dir), relative, libc::O_RDONLY, 0) {
        Ok(fd) => Ok(fd),
        Err(_) => fcntl::open(relative, libc::O_RDONLY, 0),
    }
}

/// Read the first line of `fd` up to `limit` bytes or the first newline,
/// whichever comes first. Bytes past the newline (if any were read ahead)
/// are discarded; this is only ever used to parse a `#!` line.
fn read_first_line(fd: BorrowedFd, limit: usize) -> io::Result<Vec<u8>>
{
    let mut buf = vec![0u8; limit];
    let mut filled = 0;

    while filled < buf.len() {
        let n = unistd::read(fd, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
        if buf[..filled].contains(&b'\n') {
            break;
        }
    }

    buf.truncate(filled);
    if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        buf.truncate(pos + 1);
    }

    Ok(buf)
}

const MAX_SHEBANG_LINE: usize = 4096;

/// Parse the interpreter path out of a `#!` line's bytes (not including
/// the leading `#!`).
///
/// Skips leading spaces/tabs, then reads until whitespace or newline,
/// treating a backslash as escaping the character that follows it (the
/// backslash itself is retained verbatim, matching the original parser).
/// Returns [`None`] if the line has no interpreter path before a newline.
fn parse_interpreter_path(rest: &[u8]) -> Option<Vec<u8>>
{
    let mut i = 0;
    while i < rest.len() && (rest[i] == b' ' || rest[i] == b'\t') {
        i += 1;
    }

    if i >= rest.len() || rest[i] == b'\n' {
        return None;
    }

    let start = i;
    let mut j = i + 1;
    while j < rest.len()
        && (rest[j - 1] == b'\\'
            || (rest[j] != b' ' && rest[j] != b'\t' && rest[j] != b'\n'))
    {
        j += 1;
    }

    Some(rest[start..j].to_vec())
}

/// Given a target file that may be a native executable or a `#!` script,
/// exec it by file descriptor with the resolved argv.
///
/// On success this function never returns. On failure it returns the
/// last I/O error encountered; the caller is expected to report a
/// diagnostic and terminate the child.
pub fn launch(
    mirror_dir: BorrowedFd,
    target: &Path,
    argv: &[CString],
    envp: &[CString],
) -> io::Result<Infallible>
{
    let header_fd = open_with_fallback(mirror_dir, target)?;
    let line = read_first_line(header_fd.as_fd(), MAX_SHEBANG_LINE)?;
    drop(header_fd);

    if line.len() >= 2 && &line[..2] == b"#!" {
        let interpreter = parse_interpreter_path(&line[2..])
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOEXEC))?;
        let interpreter_path = Path::new(std::ffi::OsStr::from_bytes(&interpreter));

        let interpreter_cstring = CString::new(interpreter)
            .map_err(|_| io::Error::from_raw_os_error(libc::EINVAL))?;

        let mut new_argv: Vec<CString> = Vec::with_capacity(argv.len() + 1);
        new_argv.push(interpreter_cstring);
        new_argv.extend(argv.iter().cloned());

        let exec_fd = open_with_fallback(mirror_dir, interpreter_path)?;
        let argv_ptrs = process::build_exec_argv(&new_argv);
        let envp_ptrs = process::build_exec_argv(envp);
        process::fexecve(exec_fd.as_fd(), &argv_ptrs, &envp_ptrs)
    } else {
        let exec_fd = open_with_fallback(mirror_dir, target)?;
        let argv_ptrs = process::build_exec_argv(argv);
        let envp_ptrs = process::build_exec_argv(envp);
        process::fexecve(exec_fd.as_fd(), &argv_ptrs, &envp_ptrs)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn parses_simple_interpreter()
    {
        assert_eq!(
            parse_interpreter_path(b"/bin/sh\n"),
            Some(b"/bin/sh".to_vec()),
        );
    }

    #[test]
    fn skips_leading_whitespace()
    {
        assert_eq!(
            parse_interpreter_path(b"  /bin/sh arg\n"),
            Some(b"/bin/sh".to_vec()),
        );
    }

    #[test]
    fn respects_backslash_continuation()
    {
        assert_eq!(
            parse_interpreter_path(b"/opt/my\\ interp arg\n"),
            Some(b"/opt/my\\ interp".to_vec()),
        );
    }

    #[test]
    fn empty_path_before_newline_is_none()
    {
        assert_eq!(parse_interpreter_path(b"\n"), None);
        assert_eq!(parse_interpreter_path(b"   \n"), None);
    }
}
