//! Thread-safe hand-off from the backend thread to the poll thread
//!
//! Producers (backend callbacks) push, the single poll-side consumer drains
//! everything in one critical section. Normalization happens before the lock
//! is taken; nothing but the container mutation happens while it is held.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use paths::normalize;
use tracing::{trace, warn};

use crate::event::{Action, FileWatchEvent, RawEvent};
use crate::source::WatchListener;

/// Default backlog size that triggers a warning
pub const DEFAULT_WARN_THRESHOLD: usize = 10_000;

/// FIFO of pending file events
///
/// Unbounded: a stalled consumer makes it grow. The warning threshold only
/// reports that, it never drops events.
pub struct EventQueue {
    /// Pending events in delivery order
    events: Mutex<VecDeque<FileWatchEvent>>,

    /// Mirror of `events.len()` for lock-free emptiness checks
    pending: AtomicUsize,

    /// Largest backlog seen
    high_water: AtomicUsize,

    /// Backlog size that triggers a warning (0 = never)
    warn_threshold: usize,

    /// Set once the current backlog has been warned about
    warned: AtomicBool,
}

impl EventQueue {
    /// Create a queue with the default warning threshold
    pub fn new() -> Self {
        Self::with_warn_threshold(DEFAULT_WARN_THRESHOLD)
    }

    /// Create a queue that warns once its backlog reaches `warn_threshold`
    pub fn with_warn_threshold(warn_threshold: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            warn_threshold,
            warned: AtomicBool::new(false),
        }
    }

    /// Queue a raw backend event
    ///
    /// Moves are dropped. Returns whether the event was queued.
    pub fn push(&self, raw: RawEvent) -> bool {
        let Some(action) = Action::from_raw(raw.action) else {
            trace!(watch_id = %raw.watch_id, filename = %raw.filename, "dropping move event");
            return false;
        };

        let event = FileWatchEvent {
            action,
            watch_id: raw.watch_id,
            filename: normalize(&raw.filename),
        };

        let len = {
            let mut events = self.events.lock();
            events.push_back(event);
            let len = events.len();
            self.pending.store(len, Ordering::Release);
            len
        };

        self.high_water.fetch_max(len, Ordering::Relaxed);
        if self.warn_threshold > 0
            && len >= self.warn_threshold
            && !self.warned.swap(true, Ordering::Relaxed)
        {
            warn!(
                "File event backlog reached {} (is the poll loop running?)",
                len
            );
        }

        true
    }

    /// Take every queued event, in order
    ///
    /// The queue is empty when this returns. Events pushed concurrently are
    /// either part of the result or left for the next drain, never both.
    pub fn drain_all(&self) -> Vec<FileWatchEvent> {
        let drained = {
            let mut events = self.events.lock();
            self.pending.store(0, Ordering::Release);
            std::mem::take(&mut *events)
        };

        self.warned.store(false, Ordering::Relaxed);
        drained.into()
    }

    /// Lock-free emptiness check
    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Largest backlog observed so far
    pub fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchListener for EventQueue {
    fn handle_file_action(&self, event: RawEvent) {
        self.push(event);
    }
}
