//! In-memory doubles for the backend and consumer seams.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use parking_lot::Mutex;

use crate::dispatch::Consumer;
use crate::error::{Result, WatchError};
use crate::event::{FileEvent, RawAction, RawEvent, WatchId};
use crate::source::{NotificationSource, WatchListener};

#[derive(Default)]
struct FakeState {
    next_id: i64,
    watches: HashMap<WatchId, (PathBuf, Arc<dyn WatchListener>)>,
    created: usize,
    removed: Vec<WatchId>,
    fail_next: Option<WatchError>,
}

/// Backend that records calls and fires events on demand.
///
/// Clones share state, so a test can keep a handle after moving the source
/// into a registry or bridge.
#[derive(Clone, Default)]
pub struct FakeSource {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_watch` fail with `error`.
    pub fn fail_next(&self, error: WatchError) {
        self.state.lock().fail_next = Some(error);
    }

    /// Deliver a raw event for watch `id`, as a backend thread would.
    ///
    /// Returns `false` when the watch is not active.
    pub fn fire(&self, id: WatchId, filename: &str, action: RawAction) -> bool {
        let target = {
            let state = self.state.lock();
            state
                .watches
                .get(&id)
                .map(|(location, listener)| (location.clone(), Arc::clone(listener)))
        };

        match target {
            Some((location, listener)) => {
                let directory = location.to_string_lossy().into_owned();
                listener.handle_file_action(RawEvent::new(id, directory, filename, action));
                true
            }
            None => false,
        }
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().created
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().watches.len()
    }

    pub fn removed(&self) -> Vec<WatchId> {
        self.state.lock().removed.clone()
    }

    pub fn location(&self, id: WatchId) -> Option<PathBuf> {
        self.state
            .lock()
            .watches
            .get(&id)
            .map(|(location, _)| location.clone())
    }
}

impl NotificationSource for FakeSource {
    fn create_watch(
        &self,
        directory: &Path,
        _recursive: bool,
        listener: Arc<dyn WatchListener>,
    ) -> Result<WatchId> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next.take() {
            return Err(error);
        }

        state.next_id += 1;
        state.created += 1;
        let id = WatchId::new(state.next_id);
        state.watches.insert(id, (directory.to_path_buf(), listener));
        Ok(id)
    }

    fn remove_watch(&self, id: WatchId) {
        let mut state = self.state.lock();
        if state.watches.remove(&id).is_some() {
            state.removed.push(id);
        }
    }
}

/// Consumer that keeps every delivered event.
pub struct RecordingConsumer {
    pub events: Vec<FileEvent>,
    pub ready: bool,
    fail_on: Option<String>,
    panic_on: Option<String>,
}

impl Default for RecordingConsumer {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            ready: true,
            fail_on: None,
            panic_on: None,
        }
    }
}

impl RecordingConsumer {
    /// Return an error for paths ending in `suffix`.
    pub fn failing_on(mut self, suffix: &str) -> Self {
        self.fail_on = Some(suffix.to_string());
        self
    }

    /// Panic for paths ending in `suffix`.
    pub fn panicking_on(mut self, suffix: &str) -> Self {
        self.panic_on = Some(suffix.to_string());
        self
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }
}

impl Consumer for RecordingConsumer {
    fn on_file_event(&mut self, event: &FileEvent) -> anyhow::Result<()> {
        if let Some(suffix) = &self.panic_on {
            if event.path.ends_with(suffix.as_str()) {
                panic!("consumer blew up on {}", event.path);
            }
        }
        if let Some(suffix) = &self.fail_on {
            if event.path.ends_with(suffix.as_str()) {
                bail!("consumer rejected {}", event.path);
            }
        }
        self.events.push(event.clone());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}
