//! Seams to the OS notification backend.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::event::{RawEvent, WatchId};

/// Receives raw backend events.
///
/// Called on whatever thread the backend delivers on, possibly several.
pub trait WatchListener: Send + Sync {
    fn handle_file_action(&self, event: RawEvent);
}

/// OS-level directory watcher.
pub trait NotificationSource {
    /// Start watching `directory`, delivering its events to `listener`.
    ///
    /// With `recursive == false` only direct children are reported.
    fn create_watch(
        &self,
        directory: &Path,
        recursive: bool,
        listener: Arc<dyn WatchListener>,
    ) -> Result<WatchId>;

    /// Stop a watch. Unknown ids are ignored.
    fn remove_watch(&self, id: WatchId);
}
