//! Executable lookup on the search path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};

/// Resolves command tokens to absolute executable paths.
#[derive(Debug, Clone)]
pub struct PathResolver {
    search_path: Option<OsString>,
    cwd: PathBuf,
}

impl PathResolver {
    /// Use the daemon's own `PATH` and working directory.
    pub fn from_env() -> Self {
        Self {
            search_path: std::env::var_os("PATH"),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")),
        }
    }

    /// Use an explicit `:`-separated search path.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
            cwd: PathBuf::from("/"),
        }
    }

    /// Resolve `token` to an existing executable file.
    ///
    /// Absolute tokens are checked in place; anything else is searched
    /// for on the search path.
    pub fn find_executable(&self, token: &str) -> Option<PathBuf> {
        if token.is_empty() {
            return None;
        }

        let path = Path::new(token);
        if path.is_absolute() {
            return is_executable_file(path).then(|| path.to_path_buf());
        }

        let search_path = self.search_path.as_ref()?;
        which::which_in(token, Some(search_path), &self.cwd).ok()
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_env()
    }
}

/// True if `path` is a regular file the caller may execute.
pub fn is_executable_file(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}
