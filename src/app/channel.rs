//! Latest-wins frame channels between stages.
//!
//! Built on `tokio::sync::watch`: the slot holds at most one frame, publishing never
//! blocks, and a frame nobody read yet is simply replaced. Receivers remember the last
//! frame they saw so a slow producer never leaves them without data.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// What a receiver got on one poll.
#[derive(Debug)]
pub enum Latest<T> {
    /// A frame published since the previous poll.
    Fresh(Arc<T>),
    /// Nothing new arrived; this is the last frame seen.
    Reused(Arc<T>),
    /// Nothing new arrived and nothing was ever received.
    Empty,
    /// The producer is gone and every frame it published has been seen.
    Closed,
}

impl<T> Latest<T> {
    /// The frame, fresh or reused.
    pub fn frame(&self) -> Option<&Arc<T>> {
        match self {
            Self::Fresh(frame) | Self::Reused(frame) => Some(frame),
            Self::Empty | Self::Closed => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

pub struct LatestSender<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

pub struct LatestReceiver<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
    last: Option<Arc<T>>,
}

/// Creates an empty latest-wins channel.
pub fn latest<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let (tx, rx) = watch::channel(None);
    (LatestSender { tx }, LatestReceiver { rx, last: None })
}

impl<T> LatestSender<T> {
    /// Replaces whatever is in the slot. Returns `false` once every receiver is gone.
    pub fn publish(&self, frame: T) -> bool {
        self.tx.send_replace(Some(Arc::new(frame)));
        !self.tx.is_closed()
    }
}

impl<T> LatestReceiver<T> {
    /// Waits up to `timeout` for a new frame, falling back to the last one seen.
    pub async fn wait(&mut self, timeout: Duration) -> Latest<T> {
        match tokio::time::timeout(timeout, self.rx.changed()).await {
            Ok(Ok(())) => self.take(),
            Ok(Err(_)) => self.drain_closed(),
            Err(_) => self.reuse(),
        }
    }

    /// Non-blocking variant of [`wait`](Self::wait).
    pub fn poll(&mut self) -> Latest<T> {
        match self.rx.has_changed() {
            Ok(true) => self.take(),
            Ok(false) => self.reuse(),
            Err(_) => self.drain_closed(),
        }
    }

    /// After the sender is gone, hands out its final frame once if it was never seen.
    fn drain_closed(&mut self) -> Latest<T> {
        let frame = self.rx.borrow_and_update().clone();
        match (frame, &self.last) {
            (Some(frame), Some(last)) if Arc::ptr_eq(&frame, last) => Latest::Closed,
            (Some(frame), _) => {
                self.last = Some(Arc::clone(&frame));
                Latest::Fresh(frame)
            }
            (None, _) => Latest::Closed,
        }
    }

    fn take(&mut self) -> Latest<T> {
        let frame = self.rx.borrow_and_update().clone();
        match frame {
            Some(frame) => {
                self.last = Some(Arc::clone(&frame));
                Latest::Fresh(frame)
            }
            None => self.reuse(),
        }
    }

    fn reuse(&self) -> Latest<T> {
        match &self.last {
            Some(frame) => Latest::Reused(Arc::clone(frame)),
            None => Latest::Empty,
        }
    }
}
