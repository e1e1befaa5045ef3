//! File watch bridge
//!
//! Bridges OS change notifications, delivered on backend threads, to a
//! single-threaded polling consumer:
//! - Reference-counted, deduplicated directory watches
//! - A locked FIFO between the backend thread and the poll thread
//! - Per-tick dispatch with paths translated into the consumer's root
//!
//! ```text
//! Bridge::watch ──► WatchRegistry ──► NotificationSource
//!                                         │ (backend thread)
//!                                         ▼
//! Bridge::tick ──► Dispatcher ◄── EventQueue
//!                     │
//!                     ▼
//!                  Consumer
//! ```

pub mod backend;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod queue;
pub mod registry;
pub mod source;

#[cfg(test)]
mod testing;

pub use backend::NotifySource;
pub use bridge::{Bridge, BridgeStats};
pub use config::{example_config, BridgeConfig};
pub use dispatch::{Consumer, Dispatcher, TickStats};
pub use error::{ErrorCode, Result, WatchError};
pub use event::{host_constants, Action, FileEvent, FileWatchEvent, RawAction, RawEvent, WatchId};
pub use queue::EventQueue;
pub use registry::{WatchEntry, WatchRegistry};
pub use source::{NotificationSource, WatchListener};
