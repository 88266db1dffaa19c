//! Latest-wins frame delivery.
//!
//! Frame delivery is a bounded channel of capacity 1 where a newer
//! value replaces an undelivered older one. This is the frame-dropping
//! contract of a live preview made explicit: detection always works on
//! the freshest frame and never against a backlog. Single producer,
//! single consumer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvError, Sender, TryRecvError, TrySendError};

use crate::shared::constants::FRAME_CHANNEL_CAPACITY;

pub struct LatestSender<T> {
    tx: Sender<T>,
    drain: Receiver<T>,
    dropped: Arc<AtomicUsize>,
}

pub struct LatestReceiver<T> {
    rx: Receiver<T>,
    dropped: Arc<AtomicUsize>,
}

/// Create a connected latest-wins pair.
pub fn latest_wins<T>() -> (LatestSender<T>, LatestReceiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(FRAME_CHANNEL_CAPACITY);
    let dropped = Arc::new(AtomicUsize::new(0));
    (
        LatestSender {
            tx,
            drain: rx.clone(),
            dropped: dropped.clone(),
        },
        LatestReceiver { rx, dropped },
    )
}

impl<T> LatestSender<T> {
    /// Deliver `value`, displacing an undelivered predecessor.
    ///
    /// Never blocks. Returns the value back only when the receiver has
    /// disconnected.
    pub fn send(&self, value: T) -> Result<(), T> {
        match self.tx.try_send(value) {
            Ok(()) => Ok(()),
            Err(TrySendError::Disconnected(value)) => Err(value),
            Err(TrySendError::Full(value)) => {
                if self.drain.try_recv().is_ok() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                match self.tx.try_send(value) {
                    Ok(()) => Ok(()),
                    Err(TrySendError::Disconnected(value)) => Err(value),
                    // Can only lose this race to the consumer taking a
                    // slot back, which means it is keeping up; count
                    // the newcomer as dropped and move on.
                    Err(TrySendError::Full(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Frames displaced or discarded so far.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T> LatestReceiver<T> {
    /// Block until the next frame arrives or the sender disconnects.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.rx.recv()
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
