//! Persistent process state: the data that is resolved once at startup,
//! held read-only (apart from the handle table) for the lifetime of the
//! mount, and released at teardown.

use {
    crate::{
        procedure::{Procedure, Registry},
        script_runner, test_evaluator,
        Result,
    },
    os_ext::fcntl,
    std::{
        ffi::CString,
        io,
        os::unix::{
            ffi::OsStrExt,
            io::{AsFd, OwnedFd},
        },
        path::{Path, PathBuf},
    },
};

/// Whether `stat` reports a script's stored source size or the size of
/// its materialized stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMode
{
    /// Report the size of the script's source file. The default.
    Stored,

    /// Materialize the script and report the size of its stdout.
    Materialized,
}

/// Everything the core needs for the lifetime of one mount.
///
/// Built once at startup by [`State::new`]; `mirror_dir` is released when
/// this value is dropped. `procedures` is installed once and never
/// mutated afterward, so it requires no synchronization even though the
/// façade calls into it from several upcall threads concurrently.
pub struct State
{
    pub mirror_path: PathBuf,
    pub mirror_dir: OwnedFd,
    pub procedures: Registry,
    pub temp_template: PathBuf,
    pub env: Vec<CString>,
    pub size_mode: SizeMode,
}

/// Choose `/dev/shm` as the temp directory if it exists and is a
/// directory, else fall back to `/tmp`.
fn choose_temp_dir() -> &'static Path
{
    let shm = Path::new("/dev/shm");
    if shm.is_dir() { shm } else { Path::new("/tmp") }
}

/// Snapshot the process environment as a `NUL`-terminated `KEY=VALUE`
/// vector, suitable for reuse across every child exec'd for the lifetime
/// of the mount.
fn capture_env() -> Vec<CString>
{
    std::env::vars_os()
        .filter_map(|(key, value)| {
            let mut entry = key;
            entry.push("=");
            entry.push(value);
            CString::new(entry.as_os_str().as_bytes()).ok()
        })
        .collect()
}

impl State
{
    /// Resolve `mirror` to a canonical absolute path, open a directory
    /// descriptor on it, and install the default procedure if `procedures`
    /// is empty.
    ///
    /// Both `mirror` and `mountpoint` must already exist as directories;
    /// the caller (lifecycle/CLI layer) is expected to have checked
    /// `mountpoint` itself, since this type has no use for its path.
    pub fn new(mirror: &Path, mut procedures: Registry, size_mode: SizeMode) -> io::Result<Self>
    {
        let mirror_path = mirror.canonicalize()?;
        let mirror_dir = fcntl::openat(
            None, &mirror_path, libc::O_RDONLY | libc::O_DIRECTORY, 0,
        )?;

        procedures.install_default_if_empty();

        let temp_template = choose_temp_dir().join("sfs.XXXXXX");
        let env = capture_env();

        log::info!(
            "mirror={} temp_template={} procedures={}",
            mirror_path.display(),
            temp_template.display(),
            procedures.iter().count(),
        );

        Ok(Self { mirror_path, mirror_dir, procedures, temp_template, env, size_mode })
    }

    /// Classify `relative` against the procedure registry, returning the
    /// first matching procedure, if any.
    pub fn classify(&self, relative: &Path) -> Option<&Procedure>
    {
        test_evaluator::classify(self.mirror_dir.as_fd(), &self.env, &self.procedures, relative)
    }

    /// Materialize `relative`'s output under `procedure` into a fresh,
    /// unlinked temp file, positioned at offset 0.
    pub fn run_script(&self, relative: &Path, procedure: &Procedure) -> Result<OwnedFd>
    {
        script_runner::run_script(
            self.mirror_dir.as_fd(), &self.env, &self.temp_template, relative, procedure,
        )
    }

    /// Convenience: classify then materialize in one step.
    pub fn run_script_if_matched(&self, relative: &Path) -> Result<Option<OwnedFd>>
    {
        match self.classify(relative) {
            Some(procedure) => self.run_script(relative, procedure).map(Some),
            None => Ok(None),
        }
    }
}
