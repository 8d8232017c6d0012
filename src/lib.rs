#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod engine;
mod error;
pub mod files;
mod io;
#[cfg(feature = "logging")]
mod logging;
mod output;
mod pipeline;
mod project;
pub mod script;
pub mod style;
mod utils;

pub use crate::engine::{Registry, Report, Task, TaskReport};
pub use crate::error::*;
pub use crate::files::{PassThrough, SourceMapping};
pub use crate::pipeline::{Kind, ScriptTask, StyleTask};
pub use crate::project::Project;
pub use crate::script::{Bundler, ScriptOptions};
pub use crate::style::StyleOptions;

#[cfg(feature = "live")]
pub use crate::engine::watch;
#[cfg(feature = "logging")]
pub use crate::logging::init_logging;

/// This value controls whether a build step runs in the `Build` or the
/// `Watch` mode. In `Build` mode every task runs just once. In `Watch` mode
/// every task runs once, then the source directories are watched and the
/// tasks affected by a change are run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run every task once.
    Build,
    /// Keep running tasks on file changes.
    Watch,
}
