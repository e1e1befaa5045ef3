//! The bridge context: registration API and poll entry point
//!
//! Owns the registry (and through it the backend), the shared queue, the
//! dispatcher and the root table. Several independent bridges can coexist.
//! Dropping a bridge, or calling [`Bridge::shutdown`], removes every OS
//! watch before the backend itself is released.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use paths::{fix_slashes, normalize, remove_dot_slashes, strip_file_name, Roots};
use tracing::{debug, info};

use crate::backend::NotifySource;
use crate::config::BridgeConfig;
use crate::dispatch::{Consumer, Dispatcher, TickStats};
use crate::error::{Result, WatchError};
use crate::event::WatchId;
use crate::queue::EventQueue;
use crate::registry::WatchRegistry;
use crate::source::NotificationSource;

/// Snapshot of bridge activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Active OS watches
    pub active_watches: usize,
    /// Live subscriptions across all watches
    pub total_refs: usize,
    /// Events waiting for the next tick
    pub queued: usize,
    /// Largest backlog seen
    pub queue_high_water: usize,
    /// Lifetime dispatch counts
    pub totals: TickStats,
}

/// File watch bridge between a notification backend and a polling consumer
pub struct Bridge<S: NotificationSource, C: Consumer> {
    registry: WatchRegistry<S>,
    queue: Arc<EventQueue>,
    dispatcher: Dispatcher<C>,
    roots: Roots,
    totals: TickStats,
}

impl<S: NotificationSource, C: Consumer> Bridge<S, C> {
    /// Create a bridge reporting event paths relative to `output_root`
    pub fn new(source: S, consumer: C, roots: Roots, output_root: impl Into<String>) -> Self {
        Self::with_queue(source, consumer, roots, output_root, EventQueue::new())
    }

    /// Create a bridge from a validated config
    pub fn from_config(source: S, consumer: C, config: &BridgeConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self::with_queue(
            source,
            consumer,
            config.roots(),
            config.output_root.clone(),
            EventQueue::with_warn_threshold(config.queue_warn_threshold),
        ))
    }

    fn with_queue(
        source: S,
        consumer: C,
        roots: Roots,
        output_root: impl Into<String>,
        queue: EventQueue,
    ) -> Self {
        let queue = Arc::new(queue);
        Self {
            registry: WatchRegistry::new(source, queue.clone()),
            queue,
            dispatcher: Dispatcher::new(consumer, output_root),
            roots,
            totals: TickStats::default(),
        }
    }

    /// Watch the directory containing a root-relative path
    ///
    /// The path is collapsed (escaping the root fails with `FileOutOfScope`),
    /// resolved in `root` (failure, including a path that exists under no
    /// search path, is `FileNotFound`) and reduced to its directory. Watching an already watched directory returns the same id.
    pub fn watch(&mut self, path: &str, root: &str) -> Result<WatchId> {
        let relative =
            remove_dot_slashes(path).ok_or_else(|| WatchError::FileOutOfScope(path.to_string()))?;

        let located = self
            .roots
            .locate(&relative, root)
            .ok_or_else(|| WatchError::FileNotFound(format!("{}:{}", root, path)))?;

        let (directory, location) = directory_to_watch(&located);
        if directory.is_empty() {
            return Err(WatchError::FileNotFound(format!("{}:{}", root, path)));
        }

        let id = self.registry.subscribe(&directory, &location)?;
        debug!(watch_id = %id, root, path, "Watch registered");
        Ok(id)
    }

    /// [`Bridge::watch`] folded into one number for the host: a positive
    /// watch id or a negative error code
    pub fn watch_code(&mut self, path: &str, root: &str) -> i64 {
        match self.watch(path, root) {
            Ok(id) => id.get(),
            Err(e) => {
                debug!(root, path, "Watch failed: {}", e);
                e.code().get()
            }
        }
    }

    /// Release one subscription; unknown ids are ignored
    pub fn unwatch(&mut self, id: WatchId) {
        self.registry.unsubscribe(id);
    }

    /// Poll entry point: deliver queued events to the consumer
    pub fn tick(&mut self) {
        let stats = self
            .dispatcher
            .dispatch(&self.queue, &self.registry, &self.roots);
        if !stats.is_idle() {
            debug!(
                delivered = stats.delivered,
                discarded = stats.discarded,
                failed = stats.failed,
                "Dispatched file events"
            );
            self.totals.accumulate(stats);
        }
    }

    /// Remove every OS watch and release the backend
    pub fn shutdown(mut self) {
        let active = self.registry.len();
        self.registry.clear();
        info!(active, "File watch bridge shut down");
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            active_watches: self.registry.len(),
            total_refs: self.registry.total_refs(),
            queued: self.queue.len(),
            queue_high_water: self.queue.high_water_mark(),
            totals: self.totals,
        }
    }

    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    pub fn registry(&self) -> &WatchRegistry<S> {
        &self.registry
    }

    /// Shared queue (also the listener every watch reports to)
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &C {
        self.dispatcher.consumer()
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        self.dispatcher.consumer_mut()
    }
}

impl<C: Consumer> Bridge<NotifySource, C> {
    /// Bridge on the platform's native watcher
    pub fn with_notify(consumer: C, config: &BridgeConfig) -> anyhow::Result<Self> {
        Self::from_config(NotifySource::new(), consumer, config)
    }
}

/// Directory to watch for a located path, as (canonical key, on-disk path)
///
/// Existing directories are watched themselves; anything else is treated as
/// a file name and its containing directory is watched.
fn directory_to_watch(located: &Path) -> (String, PathBuf) {
    let fixed = fix_slashes(&located.to_string_lossy());
    let directory = if located.is_dir() {
        fixed
    } else {
        strip_file_name(&fixed)
    };
    (normalize(&directory), PathBuf::from(directory))
}
