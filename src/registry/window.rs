//! WindowRegistry — create/attach and detach/destroy lifecycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::config::ExcludedAppIds;
use super::source::{IdAllocator, LifecycleBridge, WindowHandle, WindowSource};

/// One tracked compositor window.
pub struct WindowEntry {
    object_path: String,
    window_id: u32,
    inner_id: u64,
    handle: Arc<dyn WindowHandle>,
}

impl WindowEntry {
    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    /// Platform window id; either reported by the handle or allocated.
    pub fn window_id(&self) -> u32 {
        self.window_id
    }

    pub fn inner_id(&self) -> u64 {
        self.inner_id
    }

    /// Current application id, as reported by the handle.
    pub fn app_id(&self) -> String {
        self.handle.app_id()
    }

    pub fn handle(&self) -> &Arc<dyn WindowHandle> {
        &self.handle
    }
}

impl fmt::Debug for WindowEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowEntry")
            .field("object_path", &self.object_path)
            .field("window_id", &self.window_id)
            .field("inner_id", &self.inner_id)
            .finish_non_exhaustive()
    }
}

/// All three indices; only ever touched through the registry's mutex.
#[derive(Default)]
struct Indices {
    by_path: HashMap<String, Arc<WindowEntry>>,
    by_window_id: HashMap<u32, Arc<WindowEntry>>,
    by_inner_id: HashMap<u64, Arc<WindowEntry>>,
}

impl Indices {
    fn insert(&mut self, entry: Arc<WindowEntry>) {
        if entry.window_id != 0 {
            self.by_window_id.insert(entry.window_id, Arc::clone(&entry));
        }
        self.by_inner_id.insert(entry.inner_id, Arc::clone(&entry));
        self.by_path.insert(entry.object_path.clone(), entry);
    }

    fn remove(&mut self, object_path: &str) -> Option<Arc<WindowEntry>> {
        let entry = self.by_path.remove(object_path)?;

        // Another live window may share a secondary key. A slot freed by
        // this entry passes to one of them so every live id stays findable.
        if self
            .by_window_id
            .get(&entry.window_id)
            .is_some_and(|e| Arc::ptr_eq(e, &entry))
        {
            match self.live_with(|e| e.window_id == entry.window_id) {
                Some(next) => self.by_window_id.insert(entry.window_id, next),
                None => self.by_window_id.remove(&entry.window_id),
            };
        }
        if self
            .by_inner_id
            .get(&entry.inner_id)
            .is_some_and(|e| Arc::ptr_eq(e, &entry))
        {
            match self.live_with(|e| e.inner_id == entry.inner_id) {
                Some(next) => self.by_inner_id.insert(entry.inner_id, next),
                None => self.by_inner_id.remove(&entry.inner_id),
            };
        }

        Some(entry)
    }

    fn live_with(&self, pred: impl Fn(&WindowEntry) -> bool) -> Option<Arc<WindowEntry>> {
        self.by_path.values().find(|e| pred(e)).cloned()
    }
}

/// Live registry of tracked windows.
///
/// Every insert, remove and lookup across all three keys happens under
/// one mutex, so no reader sees an entry in one index but not another.
/// Register and unregister are further serialized against each other so
/// that check, notify and update of one call never interleave with a
/// second mutation.
pub struct WindowRegistry {
    source: Arc<dyn WindowSource>,
    allocator: Arc<dyn IdAllocator>,
    bridge: Weak<dyn LifecycleBridge>,
    excluded: ExcludedAppIds,
    lifecycle: Mutex<()>,
    indices: Mutex<Indices>,
}

impl WindowRegistry {
    /// `bridge` is non-owning: the bridge owns the registry.
    pub fn new(
        source: Arc<dyn WindowSource>,
        allocator: Arc<dyn IdAllocator>,
        bridge: Weak<dyn LifecycleBridge>,
        excluded: ExcludedAppIds,
    ) -> Self {
        Self {
            source,
            allocator,
            bridge,
            excluded,
            lifecycle: Mutex::new(()),
            indices: Mutex::new(Indices::default()),
        }
    }

    /// Start tracking the window at `object_path`.
    ///
    /// No-op if it is already tracked, if the source cannot materialize
    /// it, or if it belongs to an excluded shell surface.
    pub fn register_window(&self, object_path: &str) {
        let _serial = self.lifecycle.lock();
        if self.indices.lock().by_path.contains_key(object_path) {
            return;
        }
        tracing::info!(object_path, "register window");

        let handle = match self.source.create_window(object_path) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(object_path, error = %e, "cannot materialize window");
                return;
            }
        };

        let app_id = handle.app_id();
        if self.excluded.contains(&app_id) {
            tracing::debug!(object_path, app_id = %app_id, "ignoring shell surface");
            return;
        }

        let window_id = match handle.window_id() {
            0 => self.allocator.allocate_id(),
            id => id,
        };

        let entry = Arc::new(WindowEntry {
            object_path: object_path.to_owned(),
            window_id,
            inner_id: handle.inner_id(),
            handle,
        });
        self.indices.lock().insert(Arc::clone(&entry));

        tracing::debug!(object_path, app_id = %app_id, window_id, "window registered");
        match self.bridge.upgrade() {
            Some(bridge) => bridge.on_attach(&entry),
            None => tracing::debug!(object_path, "lifecycle bridge gone, attach dropped"),
        }
    }

    /// Stop tracking the window at `object_path`. Unknown paths are a no-op.
    pub fn unregister_window(&self, object_path: &str) {
        let _serial = self.lifecycle.lock();
        let Some(entry) = self.find_by_object_path(object_path) else {
            return;
        };
        tracing::info!(object_path, "unregister window");

        match self.bridge.upgrade() {
            Some(bridge) => bridge.on_detach(&entry),
            None => tracing::debug!(object_path, "lifecycle bridge gone, detach dropped"),
        }

        self.indices.lock().remove(object_path);
    }

    pub fn find_by_object_path(&self, object_path: &str) -> Option<Arc<WindowEntry>> {
        self.indices.lock().by_path.get(object_path).cloned()
    }

    pub fn find_by_window_id(&self, window_id: u32) -> Option<Arc<WindowEntry>> {
        if window_id == 0 {
            return None;
        }
        self.indices.lock().by_window_id.get(&window_id).cloned()
    }

    pub fn find_by_inner_id(&self, inner_id: u64) -> Option<Arc<WindowEntry>> {
        self.indices.lock().by_inner_id.get(&inner_id).cloned()
    }

    /// Snapshot of every tracked object path.
    pub fn object_paths(&self) -> Vec<String> {
        self.indices.lock().by_path.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.indices.lock().by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
