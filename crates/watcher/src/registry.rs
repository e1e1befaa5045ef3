//! Reference-counted, deduplicated watch subscriptions
//!
//! The registry is the only caller of the backend's create/remove operations.
//! One entry exists per canonical directory; the entry and its OS watch are
//! created and destroyed together. Runs on the poll thread only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::error::Result;
use crate::event::WatchId;
use crate::source::{NotificationSource, WatchListener};

/// One active OS watch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub id: WatchId,
    /// Canonical (normalized) directory, the dedup key
    pub directory: String,
    /// On-disk location handed to the backend
    pub location: PathBuf,
    /// Number of live subscriptions, always >= 1
    pub ref_count: usize,
}

/// Registry of active watches
pub struct WatchRegistry<S: NotificationSource> {
    source: S,
    listener: Arc<dyn WatchListener>,
    entries: AHashMap<WatchId, WatchEntry>,
    by_directory: AHashMap<String, WatchId>,
}

impl<S: NotificationSource> WatchRegistry<S> {
    /// Create a registry whose watches report to `listener`
    pub fn new(source: S, listener: Arc<dyn WatchListener>) -> Self {
        Self {
            source,
            listener,
            entries: AHashMap::new(),
            by_directory: AHashMap::new(),
        }
    }

    /// Subscribe to a canonical directory
    ///
    /// Reuses the existing watch (bumping its refcount) when the directory is
    /// already watched. Otherwise creates a non-recursive OS watch on
    /// `location`; on failure the backend's error is returned and nothing is
    /// recorded.
    pub fn subscribe(&mut self, directory: &str, location: &Path) -> Result<WatchId> {
        if let Some(entry) = self
            .by_directory
            .get(directory)
            .and_then(|id| self.entries.get_mut(id))
        {
            entry.ref_count += 1;
            debug!(
                watch_id = %entry.id,
                directory,
                ref_count = entry.ref_count,
                "Reusing existing watch"
            );
            return Ok(entry.id);
        }

        let id = self
            .source
            .create_watch(location, false, Arc::clone(&self.listener))?;

        self.by_directory.insert(directory.to_string(), id);
        self.entries.insert(
            id,
            WatchEntry {
                id,
                directory: directory.to_string(),
                location: location.to_path_buf(),
                ref_count: 1,
            },
        );

        debug!(watch_id = %id, directory, "Created watch");
        Ok(id)
    }

    /// Drop one subscription
    ///
    /// Unknown ids are ignored. Returns `true` when this removed the OS watch.
    pub fn unsubscribe(&mut self, id: WatchId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            debug!(watch_id = %id, "Ignoring unsubscribe for unknown watch");
            return false;
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            debug!(watch_id = %id, ref_count = entry.ref_count, "Released watch reference");
            return false;
        }

        if let Some(entry) = self.entries.remove(&id) {
            self.by_directory.remove(&entry.directory);
            self.source.remove_watch(id);
            debug!(watch_id = %id, directory = %entry.directory, "Removed watch");
        }
        true
    }

    /// Canonical directory of a watch
    pub fn resolve(&self, id: WatchId) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.directory.as_str())
    }

    /// Full entry of a watch
    pub fn entry(&self, id: WatchId) -> Option<&WatchEntry> {
        self.entries.get(&id)
    }

    /// Id watching a canonical directory, if any
    pub fn find(&self, directory: &str) -> Option<WatchId> {
        self.by_directory.get(directory).copied()
    }

    /// Active entries, in no particular order
    pub fn entries(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.values()
    }

    /// Number of active OS watches
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no watch is active
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all refcounts
    pub fn total_refs(&self) -> usize {
        self.entries.values().map(|entry| entry.ref_count).sum()
    }

    /// Remove every OS watch regardless of refcount
    pub fn clear(&mut self) {
        for (id, entry) in self.entries.drain() {
            self.source.remove_watch(id);
            debug!(watch_id = %id, directory = %entry.directory, "Removed watch on clear");
        }
        self.by_directory.clear();
    }

    /// The backend
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: NotificationSource> Drop for WatchRegistry<S> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use crate::queue::EventQueue;
    use crate::testing::FakeSource;

    fn registry() -> (WatchRegistry<FakeSource>, FakeSource) {
        let source = FakeSource::new();
        let handle = source.clone();
        (WatchRegistry::new(source, Arc::new(EventQueue::new())), handle)
    }

    #[test]
    fn test_n_subscribes_share_one_os_watch() {
        let (mut registry, source) = registry();
        let dir = "/srv/gmod/garrysmod/lua";

        let ids: Vec<WatchId> = (0..5)
            .map(|_| registry.subscribe(dir, Path::new(dir)).unwrap())
            .collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(source.created_count(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entry(ids[0]).unwrap().ref_count, 5);

        for n in 0..5 {
            let removed = registry.unsubscribe(ids[0]);
            assert_eq!(removed, n == 4);
            assert_eq!(source.removed(), if n == 4 { vec![ids[0]] } else { vec![] });
        }
        assert!(registry.is_empty());
        assert_eq!(registry.find(dir), None);
    }

    #[test]
    fn test_distinct_directories_get_distinct_watches() {
        let (mut registry, source) = registry();
        let a = registry.subscribe("/a", Path::new("/a")).unwrap();
        let b = registry.subscribe("/b", Path::new("/b")).unwrap();

        assert_ne!(a, b);
        assert_eq!(source.created_count(), 2);
        assert_eq!(registry.resolve(a), Some("/a"));
        assert_eq!(registry.resolve(b), Some("/b"));
        assert_eq!(registry.total_refs(), 2);
    }

    #[test]
    fn test_backend_failure_records_nothing() {
        let (mut registry, source) = registry();
        source.fail_next(WatchError::FileNotReadable("/locked".into()));

        let err = registry.subscribe("/locked", Path::new("/locked")).unwrap_err();
        assert!(matches!(err, WatchError::FileNotReadable(_)));
        assert!(registry.is_empty());
        assert_eq!(registry.find("/locked"), None);

        // A later attempt goes back to the backend
        let id = registry.subscribe("/locked", Path::new("/locked")).unwrap();
        assert_eq!(registry.entry(id).unwrap().ref_count, 1);
    }

    #[test]
    fn test_unknown_and_double_unsubscribe_are_noops() {
        let (mut registry, source) = registry();
        assert!(!registry.unsubscribe(WatchId::new(42)));

        let id = registry.subscribe("/a", Path::new("/a")).unwrap();
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert_eq!(source.removed(), vec![id]);

        // Re-subscribing creates a fresh watch
        let again = registry.subscribe("/a", Path::new("/a")).unwrap();
        assert_ne!(again, id);
        assert_eq!(source.created_count(), 2);
    }

    #[test]
    fn test_backend_receives_location_not_key() {
        let (mut registry, source) = registry();
        let id = registry
            .subscribe("/tmp/mixedcase", Path::new("/tmp/MixedCase"))
            .unwrap();
        assert_eq!(source.location(id), Some(PathBuf::from("/tmp/MixedCase")));
    }

    #[test]
    fn test_clear_and_drop_remove_all_os_watches() {
        let (mut registry, source) = registry();
        registry.subscribe("/a", Path::new("/a")).unwrap();
        registry.subscribe("/a", Path::new("/a")).unwrap();
        registry.subscribe("/b", Path::new("/b")).unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(source.active_count(), 0);

        registry.subscribe("/c", Path::new("/c")).unwrap();
        drop(registry);
        assert_eq!(source.active_count(), 0);
        assert_eq!(source.removed().len(), 3);
    }
}
