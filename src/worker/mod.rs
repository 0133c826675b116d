//! worker
//!
//! Event pipeline between the webhook endpoint and the cascade engine.
//!
//! # Architecture
//!
//! ```text
//! endpoint --send--> EventQueue (bounded) --recv--> EventWorker --> CascadeRunner
//! ```
//!
//! There is exactly one [`EventWorker`] per process and it handles one event
//! at a time, so at most one cascade touches any working copy. The endpoint
//! only enqueues; git and API work happen on the worker. Git work runs on
//! the blocking pool and is awaited before the next event is taken.
//!
//! # Modules
//!
//! - [`event`]: webhook payload and queued event types
//! - [`queue`]: bounded channel wrapper
//! - [`worker`]: the consumer and its outcome types
//!
//! # Example
//!
//! ```ignore
//! use cascade_merge::worker::{EventQueue, EventWorker, WorkerSettings};
//!
//! let (sender, receiver) = EventQueue::bounded(config.queue_capacity);
//! let worker = EventWorker::new(forge, WorkerSettings::from(&config));
//! tokio::spawn(worker.run(receiver));
//! ```

pub mod event;
pub mod queue;
#[allow(clippy::module_inception)]
pub mod worker;

pub use event::{CascadeEvent, PullRequestPayload};
pub use queue::{EventQueue, EventReceiver, EventSender, QueueClosed};
pub use worker::{EventOutcome, EventWorker, SkipReason, WorkerSettings, WorkspaceError};
