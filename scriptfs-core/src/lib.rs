//! Classification and execution core for scriptfs.
//!
//! This crate has no notion of a mount point or a kernel upcall; it only
//! knows how to classify a mirror-relative file and, if it is a script,
//! produce its output into an anonymous file descriptor. The binary crate
//! wires this core up to a FUSE binding.

pub mod error;
pub mod executor;
pub mod handle;
pub mod path_mapper;
pub mod procedure;
pub mod script_runner;
pub mod shebang;
pub mod state;
pub mod test_evaluator;

pub use error::{Error, Result};
