//! Dock: owns the window registry and tags each attached window with
//! the application that owns its process.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::registry::{
    ExcludedAppIds, IdAllocator, LifecycleBridge, WindowEntry, WindowRegistry, WindowSource,
};
use crate::resolver::{ApplicationResolver, ResolveError};

/// Lifecycle bridge that owns a [`WindowRegistry`].
pub struct Dock {
    registry: WindowRegistry,
    resolver: ApplicationResolver,
    owners: Mutex<HashMap<String, Result<String, ResolveError>>>,
    /// Live paths the registry declined; not retried while they stay live.
    declined: Mutex<HashSet<String>>,
}

impl Dock {
    pub fn new(
        source: Arc<dyn WindowSource>,
        allocator: Arc<dyn IdAllocator>,
        excluded: ExcludedAppIds,
        resolver: ApplicationResolver,
    ) -> Arc<Self> {
        Arc::new_cyclic(|dock: &Weak<Dock>| Dock {
            registry: WindowRegistry::new(source, allocator, dock.clone(), excluded),
            resolver,
            owners: Mutex::new(HashMap::new()),
            declined: Mutex::new(HashSet::new()),
        })
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    /// Owning application of a tracked window, as resolved on attach.
    pub fn owner_of(&self, object_path: &str) -> Option<Result<String, ResolveError>> {
        self.owners.lock().get(object_path).cloned()
    }

    /// Bring the registry in line with the live set of object paths:
    /// register new windows, unregister vanished ones.
    ///
    /// A live path the registry declined (shell surface, unreadable
    /// window) is only offered again after it has left the live set.
    pub fn sync<I>(&self, live: I)
    where
        I: IntoIterator<Item = String>,
    {
        let live: HashSet<String> = live.into_iter().collect();
        let tracked: HashSet<String> = self.registry.object_paths().into_iter().collect();

        for path in tracked.difference(&live) {
            self.registry.unregister_window(path);
        }

        let mut declined = self.declined.lock();
        declined.retain(|path| live.contains(path));
        for path in live.difference(&tracked) {
            if declined.contains(path) {
                continue;
            }
            self.registry.register_window(path);
            if self.registry.find_by_object_path(path).is_none() {
                declined.insert(path.clone());
            }
        }
    }
}

impl LifecycleBridge for Dock {
    fn on_attach(&self, window: &Arc<WindowEntry>) {
        let owner = match window.handle().pid() {
            Some(pid) => self.resolver.resolve(pid),
            None => Err(ResolveError::InvalidArgument("window reports no pid".into())),
        };

        match &owner {
            Ok(app) => tracing::info!(
                object_path = window.object_path(),
                window_id = window.window_id(),
                app = %app,
                "window attached"
            ),
            Err(e) => tracing::info!(
                object_path = window.object_path(),
                window_id = window.window_id(),
                class = %window.app_id(),
                reason = %e,
                "window attached, owner unknown"
            ),
        }

        self.owners
            .lock()
            .insert(window.object_path().to_owned(), owner);
    }

    fn on_detach(&self, window: &Arc<WindowEntry>) {
        tracing::info!(
            object_path = window.object_path(),
            window_id = window.window_id(),
            "window detached"
        );
        self.owners.lock().remove(window.object_path());
    }
}
