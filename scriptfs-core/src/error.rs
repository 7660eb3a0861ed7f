//! Errors returned by the classification and execution core.

use {std::io, thiserror::Error};

/// Error returned by the core, one level above a raw [`io::Error`].
///
/// A bad path, a backing-store failure, and a fork(2) failure are all
/// surfaced as [`Error::Io`]; the façade maps it back to an errno for the
/// kernel. A script's non-zero exit or signal death is not represented
/// here at all: per §7, that is not a filesystem error, so the Script
/// Runner captures stdout regardless of exit status and only logs it.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error
{
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("fork failed: {0}")]
    Fork(io::Error),
}

impl Error
{
    /// The errno this error should be reported to the kernel as.
    pub fn raw_os_error(&self) -> i32
    {
        match self {
            Error::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            Error::Fork(err) => err.raw_os_error().unwrap_or(libc::EAGAIN),
        }
    }
}

/// Result type used throughout the core.
pub type Result<T> = std::result::Result<T, Error>;
