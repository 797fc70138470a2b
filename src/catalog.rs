//! Application catalog snapshot.
//!
//! The catalog is owned by whatever discovers installed applications;
//! the resolver only reads it. [`Catalog`] is an in-memory snapshot that
//! can be swapped atomically and loaded from a JSON file.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One declared application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationEntry {
    /// Unique application identity.
    pub id: String,
    /// Pre-flight existence check for the application's binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub try_exec: Option<String>,
    /// Launch command line, desktop-entry escaped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,
}

impl ApplicationEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            try_exec: None,
            exec: None,
        }
    }

    pub fn with_exec(mut self, exec: impl Into<String>) -> Self {
        self.exec = Some(exec.into());
        self
    }

    pub fn with_try_exec(mut self, try_exec: impl Into<String>) -> Self {
        self.try_exec = Some(try_exec.into());
        self
    }
}

/// Read access to the known applications.
///
/// Each call returns an immutable snapshot in catalog order; a resolver
/// holds on to one snapshot for the whole of a resolution.
pub trait ApplicationCatalog: Send + Sync {
    fn applications(&self) -> Arc<[ApplicationEntry]>;
}

/// Catalog load failure.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate application id: {0}")]
    DuplicateId(String),
}

/// Swappable in-memory catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: RwLock<Arc<[ApplicationEntry]>>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate identities.
    pub fn new(entries: Vec<ApplicationEntry>) -> Result<Self, CatalogError> {
        check_unique(&entries)?;
        Ok(Self {
            entries: RwLock::new(entries.into()),
        })
    }

    /// Load a JSON array of entries from `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read(path)?;
        let entries: Vec<ApplicationEntry> = serde_json::from_slice(&data)?;
        tracing::debug!(path = %path.display(), count = entries.len(), "catalog loaded");
        Self::new(entries)
    }

    /// Replace the whole snapshot. Resolutions already in flight keep
    /// the snapshot they started with.
    pub fn replace(&self, entries: Vec<ApplicationEntry>) -> Result<(), CatalogError> {
        check_unique(&entries)?;
        *self.entries.write() = entries.into();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ApplicationCatalog for Catalog {
    fn applications(&self) -> Arc<[ApplicationEntry]> {
        Arc::clone(&self.entries.read())
    }
}

fn check_unique(entries: &[ApplicationEntry]) -> Result<(), CatalogError> {
    let mut seen = std::collections::HashSet::new();
    for entry in entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(CatalogError::DuplicateId(entry.id.clone()));
        }
    }
    Ok(())
}
