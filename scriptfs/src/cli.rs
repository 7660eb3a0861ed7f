//! Command-line grammar: `scriptfs [fuse-opts] [-l] [-p PROC]... MIRROR MOUNTPOINT`.

use {clap::Parser, std::path::PathBuf};

/// Exit code for argument errors (`sysexits.h`'s `EX_USAGE`).
pub const EX_USAGE: i32 = 64;

/// Exit code for a mirror directory that could not be opened
/// (`sysexits.h`'s `EX_NOPERM`).
pub const EX_NOPERM: i32 = 77;

/// A user-space overlay filesystem that substitutes script output for
/// script content.
#[derive(Debug, Parser)]
#[command(name = "scriptfs", version, about)]
pub struct Args
{
    /// Report the materialized output size of scripts via stat, instead
    /// of the size of their source.
    #[arg(short = 'l')]
    pub materialized_size: bool,

    /// Add a procedure of the form `program[;test]`; may be given more
    /// than once, and order is significant (first match wins).
    #[arg(short = 'p', value_name = "PROC")]
    pub procedures: Vec<String>,

    /// Raise log verbosity to trace (the runtime equivalent of the
    /// original's build-time TRACE flag).
    #[arg(short = 'v', long = "trace")]
    pub trace: bool,

    /// Mount option passed through to the kernel's FUSE layer; may be
    /// given more than once.
    #[arg(short = 'o', value_name = "ARG")]
    pub mount_options: Vec<String>,

    /// Backing directory whose contents are mirrored through the mount.
    pub mirror: PathBuf,

    /// Directory at which to mount the filesystem.
    pub mountpoint: PathBuf,
}
