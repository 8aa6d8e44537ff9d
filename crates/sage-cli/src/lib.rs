//! Sage CLI - command line front end
//!
//! - `replay`: rebuild a session from a YAML script and print the tree
//! - `status`: follow an experiment run on the research backend

#![warn(unreachable_pub)]

pub mod script;
pub mod status;

pub use script::{Replay, ReplayReport, ReplayScript, ScriptAction, ScriptError};
pub use status::{status_line, watch_run};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
