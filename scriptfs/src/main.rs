//! Entry point: parse arguments, build the classification core, and hand
//! the façade to the kernel's FUSE binding.

mod cli;
mod filesystem;
mod inode_table;
mod logging;

use {
    cli::{Args, EX_NOPERM, EX_USAGE},
    clap::Parser,
    filesystem::ScriptFs,
    fuser::MountOption,
    scriptfs_core::{
        procedure::{parse_proc_arg, Registry},
        state::{SizeMode, State},
    },
    std::process::ExitCode,
};

/// Translate one `-o` argument into a `fuser::MountOption`, falling back to
/// `CUSTOM` for anything this table does not recognize by name, so
/// filesystem-specific or future kernel options still pass through.
fn mount_option(raw: &str) -> MountOption
{
    match raw {
        "ro" => MountOption::RO,
        "rw" => MountOption::RW,
        "dev" => MountOption::Dev,
        "nodev" => MountOption::NoDev,
        "suid" => MountOption::Suid,
        "nosuid" => MountOption::NoSuid,
        "exec" => MountOption::Exec,
        "noexec" => MountOption::NoExec,
        "atime" => MountOption::Atime,
        "noatime" => MountOption::NoAtime,
        "dirsync" => MountOption::DirSync,
        "sync" => MountOption::Sync,
        "async" => MountOption::Async,
        "auto_unmount" => MountOption::AutoUnmount,
        "allow_other" => MountOption::AllowOther,
        "allow_root" => MountOption::AllowRoot,
        "default_permissions" => MountOption::DefaultPermissions,
        other => match other.split_once('=') {
            Some(("fsname", name)) => MountOption::FSName(name.to_owned()),
            Some(("subtype", name)) => MountOption::Subtype(name.to_owned()),
            _ => MountOption::CUSTOM(other.to_owned()),
        },
    }
}

fn run() -> Result<(), (i32, String)>
{
    let args = Args::parse();

    logging::init(args.trace);

    let mut registry = Registry::default();
    for raw in &args.procedures {
        let procedure = parse_proc_arg(raw)
            .map_err(|err| (EX_USAGE, format!("invalid -p argument {raw:?}: {err}")))?;
        registry.push(procedure);
    }

    if !args.mirror.is_dir() {
        return Err((libc::ENOENT, format!("mirror {} is not a directory", args.mirror.display())));
    }
    if !args.mountpoint.is_dir() {
        return Err((libc::ENOENT, format!("mountpoint {} is not a directory", args.mountpoint.display())));
    }

    let size_mode = if args.materialized_size { SizeMode::Materialized } else { SizeMode::Stored };

    let state = State::new(&args.mirror, registry, size_mode)
        .map_err(|err| (EX_NOPERM, format!("cannot open mirror {}: {err}", args.mirror.display())))?;

    let mut options = vec![MountOption::FSName("scriptfs".to_owned())];
    options.extend(args.mount_options.iter().map(|raw| mount_option(raw)));

    let filesystem = ScriptFs::new(state);

    fuser::mount2(filesystem, &args.mountpoint, &options)
        .map_err(|err| (libc::EIO, format!("mount failed: {err}")))
}

fn main() -> ExitCode
{
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err((code, message)) => {
            eprintln!("scriptfs: {message}");
            ExitCode::from(code as u8)
        }
    }
}
