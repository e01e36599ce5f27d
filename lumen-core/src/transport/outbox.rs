//! Outbound queue with a latest-frame slot.
//!
//! Ordinary messages go through a bounded mpsc queue and are dropped when
//! it is full. Full-state frames are never dropped that way: a frame that
//! does not fit is parked in a single slot, replacing any frame parked
//! before it, and the receiving side picks it up once the queue has
//! drained. Frames pushed while one is parked go straight to the slot so
//! an older frame can never be delivered after a newer one.

use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, mpsc, mpsc::error::TrySendError};
use tracing::debug;

use crate::error::LumenError;

#[derive(Debug)]
struct LatestSlot<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

impl<T> LatestSlot<T> {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    fn put(&self, item: T) -> bool {
        let replaced = self.lock().replace(item).is_some();
        self.notify.notify_one();
        replaced
    }

    fn take(&self) -> Option<T> {
        self.lock().take()
    }
}

/// Sending half.
#[derive(Debug)]
pub(crate) struct Outbox<T> {
    queue: mpsc::Sender<T>,
    latest: Arc<LatestSlot<T>>,
}

/// Receiving half.
#[derive(Debug)]
pub(crate) struct Inbox<T> {
    queue: mpsc::Receiver<T>,
    latest: Arc<LatestSlot<T>>,
}

pub(crate) fn outbox<T>(capacity: usize) -> (Outbox<T>, Inbox<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let latest = Arc::new(LatestSlot {
        value: Mutex::new(None),
        notify: Notify::new(),
    });
    (
        Outbox {
            queue: tx,
            latest: latest.clone(),
        },
        Inbox { queue: rx, latest },
    )
}

impl<T> Outbox<T> {
    /// Queue without waiting. `frame` marks a full-state snapshot that
    /// supersedes every earlier one.
    pub(crate) fn offer(&self, item: T, frame: bool, what: &str) -> Result<(), LumenError> {
        if self.queue.is_closed() {
            return Err(LumenError::ChannelClosed);
        }
        if frame && self.latest.is_occupied() {
            if self.latest.put(item) {
                debug!("superseded a parked {what}");
            }
            return Ok(());
        }
        match self.queue.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) if frame => {
                debug!("outbound queue full; parked {what}");
                self.latest.put(item);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                debug!("outbound queue full; dropped {what}");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(LumenError::ChannelClosed),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl<T> Inbox<T> {
    /// Next item: queued items first, then the parked frame. `None` once
    /// the sender is gone and nothing is left.
    pub(crate) async fn recv(&mut self) -> Option<T> {
        loop {
            tokio::select! {
                biased;
                item = self.queue.recv() => return item.or_else(|| self.latest.take()),
                _ = self.latest.notify.notified() => {
                    if let Some(item) = self.latest.take() {
                        return Some(item);
                    }
                }
            }
        }
    }

    pub(crate) fn try_recv(&mut self) -> Option<T> {
        self.queue.try_recv().ok().or_else(|| self.latest.take())
    }
}
