//! Programmatic log4rs configuration.
//!
//! The CLI grammar (§6) is closed, so rather than require an external
//! `log4rs.yml` the way some tools do, the logging backend is built in
//! code: everything goes to stderr, one line per record, and the only
//! runtime knob is the `-v`/`--trace` flag raising the level.

use {
    log::LevelFilter,
    log4rs::{
        append::console::{ConsoleAppender, Target},
        config::{Appender, Config, Root},
        encode::pattern::PatternEncoder,
    },
};

/// Initialize the global logger. `trace` raises the level from `info` to
/// `trace`; logging always goes to stderr, never stdout, since stdout is
/// reserved for the kernel's own FUSE diagnostics.
pub fn init(trace: bool)
{
    let level = if trace { LevelFilter::Trace } else { LevelFilter::Info };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} [{t}] {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .expect("logging configuration is statically valid");

    if let Err(err) = log4rs::init_config(config) {
        eprintln!("scriptfs: failed to initialize logging: {err}");
    }
}
