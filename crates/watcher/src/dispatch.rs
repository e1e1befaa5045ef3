//! Per-tick delivery of queued events to the consumer

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use paths::{join, normalize, Roots};
use tracing::{debug, trace, warn};

use crate::event::{FileEvent, FileWatchEvent};
use crate::queue::EventQueue;
use crate::registry::WatchRegistry;
use crate::source::NotificationSource;

/// Sink for dispatched events, called on the poll thread.
pub trait Consumer {
    /// Handle one event. Errors are logged and never stop the batch.
    fn on_file_event(&mut self, event: &FileEvent) -> anyhow::Result<()>;

    /// Whether the consumer can take events right now.
    ///
    /// While this is `false` ticks leave the queue untouched.
    fn is_ready(&self) -> bool {
        true
    }
}

impl<F> Consumer for F
where
    F: FnMut(&FileEvent) -> anyhow::Result<()>,
{
    fn on_file_event(&mut self, event: &FileEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Outcome of one or more ticks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// Events the consumer accepted
    pub delivered: usize,
    /// Events whose watch was gone by dispatch time
    pub discarded: usize,
    /// Events whose callback returned an error or panicked
    pub failed: usize,
}

impl TickStats {
    /// Whether nothing happened
    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.discarded == 0 && self.failed == 0
    }

    /// Add another tick's counts to this one
    pub fn accumulate(&mut self, other: TickStats) {
        self.delivered += other.delivered;
        self.discarded += other.discarded;
        self.failed += other.failed;
    }
}

/// Drains the queue and invokes the consumer
pub struct Dispatcher<C: Consumer> {
    consumer: C,
    /// Root consumer paths are expressed in
    output_root: String,
}

impl<C: Consumer> Dispatcher<C> {
    /// Create a dispatcher reporting paths relative to `output_root`
    pub fn new(consumer: C, output_root: impl Into<String>) -> Self {
        Self {
            consumer,
            output_root: output_root.into(),
        }
    }

    /// Run one tick
    ///
    /// Drains the events queued right now as a single batch; anything pushed
    /// while the batch is being delivered waits for the next tick.
    pub fn dispatch<S: NotificationSource>(
        &mut self,
        queue: &EventQueue,
        registry: &WatchRegistry<S>,
        roots: &Roots,
    ) -> TickStats {
        let mut stats = TickStats::default();

        if queue.is_empty() {
            return stats;
        }
        if !self.consumer.is_ready() {
            trace!(queued = queue.len(), "Consumer not ready, deferring file events");
            return stats;
        }

        for event in queue.drain_all() {
            let Some(directory) = registry.resolve(event.watch_id) else {
                trace!(watch_id = %event.watch_id, "Discarding event for removed watch");
                stats.discarded += 1;
                continue;
            };

            let file_event = FileEvent {
                action: event.action,
                watch_id: event.watch_id,
                path: self.consumer_path(directory, &event, roots),
            };
            trace!(
                watch_id = %file_event.watch_id,
                action = %file_event.action,
                path = %file_event.path,
                "Dispatching file event"
            );

            let consumer = &mut self.consumer;
            match panic::catch_unwind(AssertUnwindSafe(|| consumer.on_file_event(&file_event))) {
                Ok(Ok(())) => stats.delivered += 1,
                Ok(Err(e)) => {
                    stats.failed += 1;
                    warn!(
                        watch_id = %file_event.watch_id,
                        path = %file_event.path,
                        "File event callback failed: {:#}",
                        e
                    );
                }
                Err(payload) => {
                    stats.failed += 1;
                    warn!(
                        watch_id = %file_event.watch_id,
                        path = %file_event.path,
                        "File event callback panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        stats
    }

    /// Path of an event in the output root, empty when it lies outside it
    fn consumer_path(&self, directory: &str, event: &FileWatchEvent, roots: &Roots) -> String {
        let full = join(directory, &event.filename);
        match roots.full_to_relative(&full, &self.output_root) {
            Some(relative) => normalize(&relative),
            None => {
                debug!(
                    path = %full,
                    root = %self.output_root,
                    "Event path is outside the output root"
                );
                String::new()
            }
        }
    }

    /// Root consumer paths are expressed in
    pub fn output_root(&self) -> &str {
        &self.output_root
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Action, RawAction, RawEvent, WatchId};
    use crate::testing::{FakeSource, RecordingConsumer};
    use std::path::Path;
    use std::sync::Arc;

    struct Fixture {
        queue: Arc<EventQueue>,
        registry: WatchRegistry<FakeSource>,
        roots: Roots,
    }

    impl Fixture {
        fn new() -> Self {
            let queue = Arc::new(EventQueue::new());
            let registry = WatchRegistry::new(FakeSource::new(), queue.clone());
            let roots = Roots::new().with_root("garrysmod", ["/srv/gmod/garrysmod"]);
            Self { queue, registry, roots }
        }

        fn watch(&mut self, directory: &str) -> WatchId {
            self.registry.subscribe(directory, Path::new(directory)).unwrap()
        }

        fn push(&self, id: WatchId, filename: &str, action: RawAction) {
            self.queue.push(RawEvent::new(id, "", filename, action));
        }
    }

    #[test]
    fn test_dispatch_translates_into_output_root() {
        let mut fx = Fixture::new();
        let id = fx.watch("/srv/gmod/garrysmod/addons/test/lua");
        fx.push(id, "X.lua", RawAction::Add);

        let mut dispatcher = Dispatcher::new(RecordingConsumer::default(), "garrysmod");
        let stats = dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);

        assert_eq!(stats, TickStats { delivered: 1, discarded: 0, failed: 0 });
        assert_eq!(
            dispatcher.consumer().events,
            vec![FileEvent {
                action: Action::Add,
                watch_id: id,
                path: "addons/test/lua/x.lua".to_string(),
            }]
        );
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_events_for_removed_watch_are_discarded() {
        let mut fx = Fixture::new();
        let id = fx.watch("/srv/gmod/garrysmod/lua");
        fx.push(id, "a.lua", RawAction::Modified);
        fx.registry.unsubscribe(id);

        let mut dispatcher = Dispatcher::new(RecordingConsumer::default(), "garrysmod");
        let stats = dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);

        assert_eq!(stats.discarded, 1);
        assert!(dispatcher.consumer().events.is_empty());
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_failing_callback_does_not_abort_batch() {
        let mut fx = Fixture::new();
        let id = fx.watch("/srv/gmod/garrysmod/lua");
        fx.push(id, "a.lua", RawAction::Add);
        fx.push(id, "bad.lua", RawAction::Add);
        fx.push(id, "boom.lua", RawAction::Add);
        fx.push(id, "c.lua", RawAction::Add);

        let consumer = RecordingConsumer::default()
            .failing_on("bad.lua")
            .panicking_on("boom.lua");
        let mut dispatcher = Dispatcher::new(consumer, "garrysmod");
        let stats = dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);

        assert_eq!(stats, TickStats { delivered: 2, discarded: 0, failed: 2 });
        let paths: Vec<&str> = dispatcher
            .consumer()
            .events
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(paths, vec!["lua/a.lua", "lua/c.lua"]);
    }

    #[test]
    fn test_not_ready_consumer_leaves_queue_alone() {
        let mut fx = Fixture::new();
        let id = fx.watch("/srv/gmod/garrysmod/lua");
        fx.push(id, "a.lua", RawAction::Add);

        let mut dispatcher = Dispatcher::new(RecordingConsumer::default().not_ready(), "garrysmod");
        assert!(dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots).is_idle());
        assert_eq!(fx.queue.len(), 1);

        dispatcher.consumer_mut().ready = true;
        let stats = dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);
        assert_eq!(stats.delivered, 1);
    }

    #[test]
    fn test_path_outside_output_root_is_empty() {
        let mut fx = Fixture::new();
        let id = fx.watch("/elsewhere");
        fx.push(id, "a.lua", RawAction::Delete);

        let mut dispatcher = Dispatcher::new(RecordingConsumer::default(), "garrysmod");
        dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);

        assert_eq!(dispatcher.consumer().events.len(), 1);
        assert_eq!(dispatcher.consumer().events[0].path, "");
    }

    #[test]
    fn test_closure_consumer() {
        let mut fx = Fixture::new();
        let id = fx.watch("/srv/gmod/garrysmod/data");
        fx.push(id, "save.txt", RawAction::Modified);

        let mut seen = Vec::new();
        {
            let consumer = |event: &FileEvent| -> anyhow::Result<()> {
                seen.push(event.path.clone());
                Ok(())
            };
            let mut dispatcher = Dispatcher::new(consumer, "garrysmod");
            dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots);
        }
        assert_eq!(seen, vec!["data/save.txt".to_string()]);
    }

    #[test]
    fn test_idle_tick_is_noop() {
        let fx = Fixture::new();
        let mut dispatcher = Dispatcher::new(RecordingConsumer::default(), "garrysmod");
        assert!(dispatcher.dispatch(&fx.queue, &fx.registry, &fx.roots).is_idle());
    }
}
