//! Application ids the registry never tracks.

use std::collections::HashSet;

/// First-party shell surfaces: dock, launcher, clipboard, OSD, polkit
/// agent and friends.
pub const DEFAULT_SHELL_SURFACES: &[&str] = &[
    "dde-dock",
    "dde-launcher",
    "dde-clipboard",
    "dde-osd",
    "dde-polkit-agent",
    "dde-simple-egl",
    "dmcs",
];

/// Set of reserved application ids excluded from registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedAppIds(HashSet<String>);

impl ExcludedAppIds {
    /// An empty set: every window is tracked.
    pub fn none() -> Self {
        Self(HashSet::new())
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.0.contains(app_id)
    }

    pub fn insert(&mut self, app_id: impl Into<String>) {
        self.0.insert(app_id.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ExcludedAppIds {
    fn default() -> Self {
        DEFAULT_SHELL_SURFACES.iter().copied().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ExcludedAppIds {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for ExcludedAppIds {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}
