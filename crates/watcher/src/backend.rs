//! `notify`-backed notification source
//!
//! Each watch owns its own `RecommendedWatcher`, so the watch id is known
//! inside the event handler without any path lookup. Dropping the handle
//! stops the OS watch.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::error::{Result, WatchError};
use crate::event::{RawAction, RawEvent, WatchId};
use crate::source::{NotificationSource, WatchListener};

/// Active OS watch
struct WatchHandle {
    directory: PathBuf,
    watcher: RecommendedWatcher,
}

/// Notification source using the platform's recommended `notify` watcher
pub struct NotifySource {
    watches: DashMap<WatchId, WatchHandle>,
    next_id: AtomicI64,
}

impl NotifySource {
    pub fn new() -> Self {
        Self {
            watches: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of active OS watches
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    fn is_watched(&self, directory: &Path) -> bool {
        self.watches
            .iter()
            .any(|handle| handle.directory == directory)
    }
}

impl Default for NotifySource {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSource for NotifySource {
    fn create_watch(
        &self,
        directory: &Path,
        recursive: bool,
        listener: Arc<dyn WatchListener>,
    ) -> Result<WatchId> {
        let metadata = std::fs::metadata(directory).map_err(|e| map_io_error(&e, directory))?;
        if !metadata.is_dir() {
            return Err(WatchError::FileNotFound(directory.display().to_string()));
        }
        std::fs::read_dir(directory).map_err(|e| map_io_error(&e, directory))?;

        if self.is_watched(directory) {
            return Err(WatchError::FileRepeated(directory.display().to_string()));
        }

        let id = WatchId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let root = directory.to_path_buf();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for raw in translate_event(id, &root, event) {
                        listener.handle_file_action(raw);
                    }
                }
                Err(e) => {
                    warn!(watch_id = %id, "Watch error: {}", e);
                }
            },
        )
        .map_err(|e| map_notify_error(e, directory))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(directory, mode)
            .map_err(|e| map_notify_error(e, directory))?;

        self.watches.insert(
            id,
            WatchHandle {
                directory: directory.to_path_buf(),
                watcher,
            },
        );
        debug!(watch_id = %id, "Started watching: {}", directory.display());

        Ok(id)
    }

    fn remove_watch(&self, id: WatchId) {
        if let Some((_, mut handle)) = self.watches.remove(&id) {
            if let Err(e) = handle.watcher.unwatch(&handle.directory) {
                debug!(watch_id = %id, "Unwatch failed (directory gone?): {}", e);
            }
            debug!(watch_id = %id, "Stopped watching: {}", handle.directory.display());
        }
    }
}

/// Map a notify event kind to a backend action; access events carry none
///
/// The halves of a rename are reported on their own: the old name as a
/// delete and the new name as an add. Only the paired form is a move.
fn raw_action(kind: &EventKind) -> Option<RawAction> {
    match kind {
        EventKind::Create(_) => Some(RawAction::Add),
        EventKind::Remove(_) => Some(RawAction::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(RawAction::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(RawAction::Add),
        EventKind::Modify(ModifyKind::Name(_)) => Some(RawAction::Moved),
        EventKind::Modify(_) => Some(RawAction::Modified),
        _ => None,
    }
}

/// Split a notify event into per-entry raw events relative to `root`
fn translate_event(id: WatchId, root: &Path, event: Event) -> Vec<RawEvent> {
    let Some(action) = raw_action(&event.kind) else {
        return Vec::new();
    };
    let directory = root.to_string_lossy().into_owned();

    // A two-path rename carries both names in one event
    if event.kind == EventKind::Modify(ModifyKind::Name(RenameMode::Both)) && event.paths.len() == 2 {
        let Some(filename) = relative_name(root, &event.paths[1]) else {
            return Vec::new();
        };
        return vec![RawEvent {
            watch_id: id,
            directory,
            filename,
            action,
            old_filename: relative_name(root, &event.paths[0]),
        }];
    }

    event
        .paths
        .iter()
        .filter_map(|path| relative_name(root, path))
        .map(|filename| RawEvent::new(id, directory.clone(), filename, action))
        .collect()
}

/// Name of `path` relative to the watched directory; `None` for the directory itself
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = match path.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => PathBuf::from(path.file_name()?),
    };
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative.to_string_lossy().into_owned())
}

fn map_io_error(err: &io::Error, directory: &Path) -> WatchError {
    let path = directory.display().to_string();
    match err.kind() {
        io::ErrorKind::NotFound => WatchError::FileNotFound(path),
        io::ErrorKind::PermissionDenied => WatchError::FileNotReadable(path),
        _ => WatchError::Unspecified(format!("{}: {}", path, err)),
    }
}

fn map_notify_error(err: notify::Error, directory: &Path) -> WatchError {
    match &err.kind {
        notify::ErrorKind::PathNotFound => {
            WatchError::FileNotFound(directory.display().to_string())
        }
        notify::ErrorKind::Io(io_err) => map_io_error(io_err, directory),
        _ => WatchError::Unspecified(format!("{}: {}", directory.display(), err)),
    }
}
