//! worker::queue
//!
//! Bounded FIFO between the endpoint and the single worker.
//!
//! A full queue makes [`EventSender::send`] wait for capacity; events are
//! never dropped. The channel closes once every sender is gone, which ends
//! the worker loop.

use thiserror::Error;
use tokio::sync::mpsc;

use super::event::CascadeEvent;

/// The worker is gone and the event was not queued.
#[derive(Debug, Error)]
#[error("event queue is closed")]
pub struct QueueClosed(pub CascadeEvent);

/// Constructor for the sender/receiver pair.
pub struct EventQueue;

impl EventQueue {
    /// A queue holding at most `capacity` pending events.
    ///
    /// A capacity of zero is raised to one.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (EventSender { tx }, EventReceiver { rx })
    }
}

/// Producer handle, cloned into every request handler.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<CascadeEvent>,
}

impl EventSender {
    /// Queue an event, waiting while the queue is full.
    pub async fn send(&self, event: CascadeEvent) -> Result<(), QueueClosed> {
        self.tx.send(event).await.map_err(|e| QueueClosed(e.0))
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Whether the worker side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle, owned by exactly one worker.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<CascadeEvent>,
}

impl EventReceiver {
    /// Next event in arrival order, `None` once all senders are dropped
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<CascadeEvent> {
        self.rx.recv().await
    }
}
