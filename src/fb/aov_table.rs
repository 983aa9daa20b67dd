use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handle to one named render output.
pub type AovHandle<E> = Arc<Mutex<E>>;

/// Name to render-output map with thread-safe first insert.
///
/// Entries are never removed; callers soft-reset them instead so their storage can be reused
/// when the name shows up again.
#[derive(Debug)]
pub struct AovTable<E> {
    entries: Mutex<HashMap<String, AovHandle<E>>>,
}

impl<E> Default for AovTable<E> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<E> AovTable<E> {
    /// Entry for `name`, built by `make` if absent. Concurrent callers racing on the same new
    /// name all receive the one entry that was inserted.
    pub fn get_or_insert_with(&self, name: &str, make: impl FnOnce() -> E) -> AovHandle<E> {
        let mut entries = self.entries.lock();
        if let Some(found) = entries.get(name) {
            return Arc::clone(found);
        }
        let created = Arc::new(Mutex::new(make()));
        entries.insert(name.to_owned(), Arc::clone(&created));
        created
    }

    /// Entry for `name` if present.
    pub fn get(&self, name: &str) -> Option<AovHandle<E>> {
        self.entries.lock().get(name).cloned()
    }

    /// Number of entries, active or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when no name was ever requested.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries sorted by name. The map lock is released before returning.
    pub fn entries(&self) -> Vec<(String, AovHandle<E>)> {
        let mut out: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }
}
