//! Command-line configuration for mount-ingest

pub mod args;

pub use args::{parse_key_value, parse_mount_arg, MountArg, MountOpts};
