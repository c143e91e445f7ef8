//! Running-instance registry
//!
//! Process-wide bookkeeping of currently-active bundle instances,
//! queryable by capability kind. Membership reflects only instances
//! between a successful `add` and a later `remove`; there is no ordering
//! guarantee, and listings are snapshots that do not track later
//! mutations.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::bundle::instance::BundleInstance;

struct Entry {
    instance: Arc<BundleInstance>,
    registered_at: DateTime<Utc>,
}

/// Concurrent registry of active bundle instances
///
/// Shared by handle (`Arc<RunningRegistry>`); it only ever holds
/// references and never mutates the instances it tracks.
pub struct RunningRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl RunningRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        RunningRegistry {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Register an instance
    ///
    /// Set semantics: adding an instance that is already present is a
    /// no-op and keeps the original registration timestamp.
    pub fn add(&self, instance: Arc<BundleInstance>) {
        let mut entries = self.entries.lock().unwrap();

        if entries.iter().any(|e| e.instance.id() == instance.id()) {
            return;
        }

        debug!(name = instance.name(), kind = instance.kind(), "Registered bundle instance");
        entries.push(Entry {
            instance,
            registered_at: Utc::now(),
        });
    }

    /// Deregister an instance; removing an absent instance is not an error
    pub fn remove(&self, instance: &BundleInstance) {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.instance.id() != instance.id());

        if entries.len() < before {
            debug!(name = instance.name(), "Deregistered bundle instance");
        }
    }

    /// Snapshot of all registered instances
    pub fn list_all(&self) -> Vec<Arc<BundleInstance>> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| Arc::clone(&e.instance))
            .collect()
    }

    /// Snapshot of instances matching a capability kind
    pub fn list_by_kind(&self, kind: &str) -> Vec<Arc<BundleInstance>> {
        self.list_by(|instance| instance.kind() == kind)
    }

    /// Snapshot of instances matching a caller-supplied predicate
    pub fn list_by<P>(&self, predicate: P) -> Vec<Arc<BundleInstance>>
    where
        P: Fn(&BundleInstance) -> bool,
    {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate(&e.instance))
            .map(|e| Arc::clone(&e.instance))
            .collect()
    }

    /// Registration timestamp for an instance id, if registered
    pub fn registered_at(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.instance.id() == id)
            .map(|e| e.registered_at)
    }

    /// Number of registered instances
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl Default for RunningRegistry {
    fn default() -> Self {
        Self::new()
    }
}
