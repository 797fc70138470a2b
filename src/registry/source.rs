//! Collaborator traits the registry consumes and notifies.

use std::sync::Arc;

use super::SourceError;
use super::window::WindowEntry;

/// A compositor-side window handle.
///
/// The registry keeps a shared reference for the lifetime of the entry
/// and asks it for everything beyond the ids it indexes.
pub trait WindowHandle: Send + Sync {
    /// Application id the window reports, e.g. `"org.gnome.Nautilus"`.
    fn app_id(&self) -> String;

    /// Platform window id (XID-like); `0` when the compositor has none.
    fn window_id(&self) -> u32;

    /// Internal id derived from the compositor handle.
    fn inner_id(&self) -> u64;

    /// Owning process, when the compositor exposes it.
    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Materializes compositor handles for object paths.
pub trait WindowSource: Send + Sync {
    fn create_window(&self, object_path: &str) -> Result<Arc<dyn WindowHandle>, SourceError>;
}

/// Hands out platform window ids for windows that arrive without one.
///
/// There is no release call; allocated ids are never returned.
pub trait IdAllocator: Send + Sync {
    fn allocate_id(&self) -> u32;
}

/// Receives attach/detach notifications for tracked windows.
///
/// Called synchronously from inside register/unregister. Implementations
/// may look windows up in the registry but must not register or
/// unregister windows from within a callback.
pub trait LifecycleBridge: Send + Sync {
    fn on_attach(&self, window: &Arc<WindowEntry>);

    /// Detach the window and tear down anything tied to its handle.
    fn on_detach(&self, window: &Arc<WindowEntry>);
}
