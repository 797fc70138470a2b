//! Process handles — /proc image-link and pidfd lookups.

use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};

use super::ResolveError;

/// A process and the executable it was running when the handle was made.
///
/// Not cached anywhere: every resolution builds a fresh handle so the
/// executable path reflects the process at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: u32,
    executable: PathBuf,
}

impl ProcessHandle {
    /// Read the canonical executable of `pid` from `/proc/{pid}/exe`.
    ///
    /// `pid == 0` is rejected as [`ResolveError::InvalidArgument`]; a
    /// missing or unreadable link means the process is gone.
    pub fn from_pid(pid: u32) -> Result<Self, ResolveError> {
        if pid == 0 {
            return Err(ResolveError::InvalidArgument("pid is zero".into()));
        }

        let executable = std::fs::read_link(format!("/proc/{pid}/exe")).map_err(|e| {
            tracing::debug!(pid, error = %e, "cannot read process image link");
            ResolveError::ProcessGone { pid: Some(pid) }
        })?;

        Ok(Self { pid, executable })
    }

    /// Build a handle for a process whose executable is already known.
    pub fn with_executable(pid: u32, executable: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            executable: executable.into(),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

/// Convert a pidfd into the pid it refers to.
///
/// Reads the `Pid:` line of `/proc/self/fdinfo/{fd}`. A descriptor
/// without that line is not a pidfd. The kernel reports `0` when the
/// process lives outside our pid namespace and `-1` once it has exited.
pub fn pid_from_pidfd(fd: impl AsFd) -> Result<u32, ResolveError> {
    let raw = fd.as_fd().as_raw_fd();
    let info = std::fs::read_to_string(format!("/proc/self/fdinfo/{raw}"))
        .map_err(|e| ResolveError::InvalidArgument(format!("fd {raw}: {e}")))?;

    pid_from_fdinfo(raw, &info)
}

fn pid_from_fdinfo(raw: i32, info: &str) -> Result<u32, ResolveError> {
    match parse_fdinfo_pid(info) {
        None => Err(ResolveError::InvalidArgument(format!(
            "fd {raw} is not a pidfd"
        ))),
        Some(pid) if pid > 0 => u32::try_from(pid)
            .map_err(|_| ResolveError::InvalidArgument(format!("pid {pid} out of range"))),
        Some(0) => Err(ResolveError::InvalidArgument(
            "process is outside this pid namespace".into(),
        )),
        Some(_) => Err(ResolveError::ProcessGone { pid: None }),
    }
}

fn parse_fdinfo_pid(info: &str) -> Option<i64> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pid:"))
        .and_then(|value| value.trim().parse().ok())
}
