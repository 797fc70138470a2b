//! Process → application resolution.
//!
//! Given a process, find the one catalog application whose launch
//! command runs the same executable. Zero matches and two or more
//! matches are both reported as distinct failures.

mod application;
mod exec;
mod path;
mod process;

use std::path::PathBuf;

pub use application::ApplicationResolver;
pub use exec::{ExecParseError, parse_exec};
pub use path::{PathResolver, is_executable_file};
pub use process::{ProcessHandle, pid_from_pidfd};

/// Terminal failure of a single resolution call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The caller handed over a handle that does not name a process.
    #[error("invalid process handle: {0}")]
    InvalidArgument(String),

    /// The process exited, or its image link can no longer be read.
    /// `pid` is `None` when the process was named by a pidfd that the
    /// kernel already reports as exited.
    #[error("{}", describe_gone(.pid))]
    ProcessGone { pid: Option<u32> },

    /// Two catalog applications launch the process's executable.
    #[error("multiple applications launch the same binary: {first}, {second}")]
    AmbiguousMatch { first: String, second: String },

    /// No catalog application launches the process's executable.
    #[error("no application launches {}", .binary.display())]
    NotFound { binary: PathBuf },
}

fn describe_gone(pid: &Option<u32>) -> String {
    match pid {
        Some(pid) => format!("process {pid} is gone"),
        None => "process behind pidfd has exited".to_string(),
    }
}
