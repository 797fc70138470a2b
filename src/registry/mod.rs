//! Live set of tracked compositor windows.
//!
//! Windows are keyed three ways: by external object path (primary), by
//! platform window id, and by the handle's internal id. Entries are
//! created and destroyed only through [`WindowRegistry`].

mod config;
mod source;
mod window;

pub use config::{DEFAULT_SHELL_SURFACES, ExcludedAppIds};
pub use source::{IdAllocator, LifecycleBridge, WindowHandle, WindowSource};
pub use window::{WindowEntry, WindowRegistry};

/// Failure to materialize a compositor handle for an object path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The object path does not name a window this source knows.
    #[error("unknown window object path: {0}")]
    UnknownObject(String),

    /// The window exists but its properties could not be read.
    #[error("window query failed: {0}")]
    Query(String),
}
