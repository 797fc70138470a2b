//! ApplicationResolver — matches a process executable against the
//! launch commands of catalog applications.

use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{ApplicationCatalog, ApplicationEntry};

use super::exec::{ExecParseError, parse_exec};
use super::path::PathResolver;
use super::process::{ProcessHandle, pid_from_pidfd};
use super::ResolveError;

/// Why a catalog entry was left out of matching. Never surfaced to
/// callers; only logged.
#[derive(Debug, thiserror::Error)]
enum Skipped {
    #[error("TryExec {0:?} does not name an executable")]
    TryExecUnavailable(String),

    #[error("unescaping Exec failed: {0}")]
    Unparseable(#[from] ExecParseError),

    #[error("Exec has no arguments")]
    EmptyCommand,

    #[error("{0:?} not found on the search path")]
    BinaryNotFound(String),
}

/// Resolves processes to catalog application ids.
///
/// Holds no locks of its own: each call takes one catalog snapshot and
/// works on it from start to finish.
pub struct ApplicationResolver {
    catalog: Arc<dyn ApplicationCatalog>,
    paths: PathResolver,
}

impl ApplicationResolver {
    pub fn new(catalog: Arc<dyn ApplicationCatalog>, paths: PathResolver) -> Self {
        Self { catalog, paths }
    }

    /// Resolve the process behind a pidfd.
    pub fn resolve_pidfd(&self, pidfd: impl AsFd) -> Result<String, ResolveError> {
        let pid = pid_from_pidfd(pidfd)?;
        self.resolve(pid)
    }

    /// Resolve `pid` to the unique application launching its executable.
    pub fn resolve(&self, pid: u32) -> Result<String, ResolveError> {
        let process = ProcessHandle::from_pid(pid)?;
        self.resolve_process(&process)
    }

    /// Match an already-read process handle against the catalog.
    ///
    /// Scans in catalog order. The second match ends the scan with
    /// [`ResolveError::AmbiguousMatch`] naming the first and second ids.
    pub fn resolve_process(&self, process: &ProcessHandle) -> Result<String, ResolveError> {
        let binary = process.executable();
        let applications = self.catalog.applications();
        let mut matched: Option<&str> = None;

        for app in applications.iter() {
            let candidate = match self.candidate_binary(app) {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(reason @ Skipped::BinaryNotFound(_)) => {
                    tracing::debug!(app = %app.id, %reason, "skipping application");
                    continue;
                }
                Err(reason) => {
                    tracing::warn!(app = %app.id, %reason, "skipping application");
                    continue;
                }
            };

            if !same_binary(&candidate, binary) {
                continue;
            }

            if let Some(first) = matched {
                tracing::warn!(
                    pid = process.pid(),
                    binary = %binary.display(),
                    first,
                    second = %app.id,
                    "multiple applications launch the same binary"
                );
                return Err(ResolveError::AmbiguousMatch {
                    first: first.to_owned(),
                    second: app.id.clone(),
                });
            }
            matched = Some(app.id.as_str());
        }

        match matched {
            Some(id) => {
                tracing::debug!(pid = process.pid(), app = id, "process resolved");
                Ok(id.to_owned())
            }
            None => Err(ResolveError::NotFound {
                binary: binary.to_path_buf(),
            }),
        }
    }

    /// The binary `app` launches, `Ok(None)` if it declares no command.
    fn candidate_binary(&self, app: &ApplicationEntry) -> Result<Option<PathBuf>, Skipped> {
        if let Some(try_exec) = app.try_exec.as_deref().filter(|t| !t.is_empty()) {
            if self.paths.find_executable(try_exec).is_none() {
                return Err(Skipped::TryExecUnavailable(try_exec.to_owned()));
            }
        }

        // Exec is optional in desktop entries.
        let Some(exec) = app.exec.as_deref().filter(|e| !e.is_empty()) else {
            return Ok(None);
        };

        let args = parse_exec(exec)?;
        let first = args.into_iter().next().ok_or(Skipped::EmptyCommand)?;

        if Path::new(&first).is_absolute() {
            return Ok(Some(PathBuf::from(first)));
        }

        match self.paths.find_executable(&first) {
            Some(found) => Ok(Some(found)),
            None => Err(Skipped::BinaryNotFound(first)),
        }
    }
}

/// Byte-for-byte path comparison; `PathBuf` equality would normalize
/// away repeated separators.
fn same_binary(candidate: &Path, binary: &Path) -> bool {
    candidate.as_os_str() == binary.as_os_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolver(entries: Vec<ApplicationEntry>) -> ApplicationResolver {
        resolver_with_path(entries, PathResolver::with_search_path("/nonexistent"))
    }

    fn resolver_with_path(entries: Vec<ApplicationEntry>, paths: PathResolver) -> ApplicationResolver {
        let catalog = Catalog::new(entries).unwrap();
        ApplicationResolver::new(Arc::new(catalog), paths)
    }

    fn foo_process() -> ProcessHandle {
        ProcessHandle::with_executable(1234, "/usr/bin/foo")
    }

    fn own_exe() -> String {
        std::env::current_exe().unwrap().to_str().unwrap().to_owned()
    }

    #[test]
    fn single_match_returns_id() {
        let resolver = resolver(vec![
            ApplicationEntry::new("A").with_exec("/usr/bin/foo --flag"),
            ApplicationEntry::new("B").with_exec("/usr/bin/bar"),
        ]);
        assert_eq!(resolver.resolve_process(&foo_process()), Ok("A".to_string()));
    }

    #[test]
    fn two_matches_are_ambiguous() {
        let resolver = resolver(vec![
            ApplicationEntry::new("A").with_exec("/usr/bin/foo --flag"),
            ApplicationEntry::new("B").with_exec("/usr/bin/bar"),
            ApplicationEntry::new("C").with_exec("/usr/bin/foo"),
        ]);
        assert_eq!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::AmbiguousMatch {
                first: "A".into(),
                second: "C".into(),
            })
        );
    }

    #[test]
    fn ambiguity_reports_first_collision_only() {
        let resolver = resolver(vec![
            ApplicationEntry::new("A").with_exec("/usr/bin/foo"),
            ApplicationEntry::new("B").with_exec("/usr/bin/foo %U"),
            ApplicationEntry::new("C").with_exec("/usr/bin/foo %F"),
        ]);
        assert_eq!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::AmbiguousMatch {
                first: "A".into(),
                second: "B".into(),
            })
        );
    }

    #[test]
    fn no_match_is_not_found() {
        let resolver = resolver(vec![ApplicationEntry::new("B").with_exec("/usr/bin/bar")]);
        assert_eq!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::NotFound {
                binary: PathBuf::from("/usr/bin/foo"),
            })
        );
    }

    #[test]
    fn empty_catalog_is_not_found() {
        let resolver = resolver(Vec::new());
        assert!(matches!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn entries_without_exec_are_skipped() {
        let resolver = resolver(vec![
            ApplicationEntry::new("NoExec"),
            ApplicationEntry::new("Blank").with_exec(""),
            ApplicationEntry::new("Spaces").with_exec("   "),
            ApplicationEntry::new("A").with_exec("/usr/bin/foo"),
        ]);
        assert_eq!(resolver.resolve_process(&foo_process()), Ok("A".to_string()));
    }

    #[test]
    fn unparseable_exec_is_skipped_not_fatal() {
        let resolver = resolver(vec![
            ApplicationEntry::new("Broken").with_exec(r#"/usr/bin/foo "--flag"#),
            ApplicationEntry::new("A").with_exec("/usr/bin/foo"),
        ]);
        assert_eq!(resolver.resolve_process(&foo_process()), Ok("A".to_string()));
    }

    #[test]
    fn missing_try_exec_excludes_entry() {
        let resolver = resolver(vec![
            ApplicationEntry::new("A")
                .with_try_exec("/nonexistent/foo")
                .with_exec("/usr/bin/foo"),
        ]);
        assert!(matches!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn present_try_exec_keeps_entry() {
        let resolver = resolver(vec![
            ApplicationEntry::new("A")
                .with_try_exec(own_exe())
                .with_exec("/usr/bin/foo"),
        ]);
        assert_eq!(resolver.resolve_process(&foo_process()), Ok("A".to_string()));
    }

    #[test]
    fn relative_exec_resolved_on_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool");
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = resolver_with_path(
            vec![
                ApplicationEntry::new("Missing").with_exec("not-installed --x"),
                ApplicationEntry::new("Tool").with_exec("tool %f"),
            ],
            PathResolver::with_search_path(dir.path()),
        );

        let process = ProcessHandle::with_executable(77, &tool);
        assert_eq!(resolver.resolve_process(&process), Ok("Tool".to_string()));
    }

    #[test]
    fn comparison_is_byte_for_byte() {
        let resolver = resolver(vec![ApplicationEntry::new("A").with_exec("/usr/bin//foo")]);
        assert!(matches!(
            resolver.resolve_process(&foo_process()),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn resolves_live_process() {
        let exe = own_exe();
        let resolver = resolver(vec![
            ApplicationEntry::new("Other").with_exec("/usr/bin/bar"),
            ApplicationEntry::new("Self").with_exec(format!("\"{exe}\" --flag")),
        ]);
        assert_eq!(resolver.resolve(std::process::id()), Ok("Self".to_string()));
    }

    #[test]
    fn zero_pid_short_circuits() {
        let resolver = resolver(vec![ApplicationEntry::new("A").with_exec("/usr/bin/foo")]);
        assert!(matches!(
            resolver.resolve(0),
            Err(ResolveError::InvalidArgument(_))
        ));
    }

    /// Counts snapshot requests so tests can tell whether a scan ran.
    struct CountingCatalog {
        inner: Catalog,
        scans: AtomicUsize,
    }

    impl ApplicationCatalog for CountingCatalog {
        fn applications(&self) -> Arc<[ApplicationEntry]> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.inner.applications()
        }
    }

    fn counting_resolver() -> (ApplicationResolver, Arc<CountingCatalog>) {
        let catalog = Arc::new(CountingCatalog {
            inner: Catalog::new(vec![ApplicationEntry::new("A").with_exec("/usr/bin/foo")]).unwrap(),
            scans: AtomicUsize::new(0),
        });
        let resolver = ApplicationResolver::new(
            catalog.clone(),
            PathResolver::with_search_path("/nonexistent"),
        );
        (resolver, catalog)
    }

    #[test]
    fn invalid_pidfd_short_circuits() {
        let (resolver, catalog) = counting_resolver();
        let not_a_pidfd = tempfile::tempfile().unwrap();
        assert!(matches!(
            resolver.resolve_pidfd(&not_a_pidfd),
            Err(ResolveError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolver.resolve(0),
            Err(ResolveError::InvalidArgument(_))
        ));
        assert_eq!(catalog.scans.load(Ordering::SeqCst), 0);

        // Sanity check that the counter does move on a real scan.
        let _ = resolver.resolve_process(&foo_process());
        assert_eq!(catalog.scans.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn vanished_process_is_gone() {
        let resolver = resolver(Vec::new());
        assert_eq!(
            resolver.resolve(u32::MAX),
            Err(ResolveError::ProcessGone { pid: Some(u32::MAX) })
        );
    }
}
