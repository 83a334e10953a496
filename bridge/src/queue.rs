//! Bounded input event queue.
//!
//! Any number of [`EventSender`]s, possibly on different native threads,
//! feed one [`EventQueue`] that is drained only by the dispatch loop. Order
//! of delivery is the order in which sends succeeded.
//!
//! Capacity counts every undelivered event, whether it is still in the
//! channel or already moved to the consumer's side. A slot is reserved
//! before sending and given back only when the event is popped or cleared.
//!
//! The queue is closed until the surface adapter is ready. Sends to a
//! closed queue fail with `QueueClosed` and the event is not retained.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use tether_hostapi::{EventCallback, InputEvent};

use crate::error::BridgeError;

/// Producer handle for the event queue. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct EventSender {
    tx: SyncSender<InputEvent>,
    open: Arc<AtomicBool>,
    queued: Arc<AtomicUsize>,
    capacity: usize,
}

impl EventSender {
    /// Enqueue `event` without blocking.
    pub fn send(&self, event: InputEvent) -> Result<(), BridgeError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(BridgeError::QueueClosed);
        }
        let capacity = self.capacity;
        self.queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map_err(|_| BridgeError::QueueFull)?;

        self.tx.try_send(event).map_err(|e| {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            match e {
                TrySendError::Full(_) => BridgeError::QueueFull,
                TrySendError::Disconnected(_) => BridgeError::QueueClosed,
            }
        })
    }

    /// Wrap this sender as a surface listener callback. Events that cannot
    /// be queued are dropped and logged.
    pub fn into_callback(self) -> EventCallback {
        Arc::new(move |event| {
            if let Err(e) = self.send(event) {
                tracing::debug!(kind = event.kind(), error = %e, "input event dropped");
            }
        })
    }
}

/// Consumer side of the event queue, owned by the dispatch thread.
pub struct EventQueue {
    tx: SyncSender<InputEvent>,
    rx: Receiver<InputEvent>,
    open: Arc<AtomicBool>,
    queued: Arc<AtomicUsize>,
    capacity: usize,
    pending: VecDeque<InputEvent>,
}

impl EventQueue {
    /// Create a closed queue holding at most `capacity` undelivered events.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self {
            tx,
            rx,
            open: Arc::new(AtomicBool::new(false)),
            queued: Arc::new(AtomicUsize::new(0)),
            capacity,
            pending: VecDeque::new(),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
            open: self.open.clone(),
            queued: self.queued.clone(),
            capacity: self.capacity,
        }
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Put `event` ahead of everything already queued.
    ///
    /// The event takes a slot like any other; it may push the count one
    /// past capacity, in which case senders see `QueueFull` until it is
    /// delivered.
    pub fn push_front(&mut self, event: InputEvent) {
        self.collect();
        self.queued.fetch_add(1, Ordering::AcqRel);
        self.pending.push_front(event);
    }

    /// Take the next event in delivery order.
    pub fn pop(&mut self) -> Option<InputEvent> {
        if self.pending.is_empty() {
            self.collect();
        }
        let event = self.pending.pop_front()?;
        self.queued.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Discard all undelivered events. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        self.collect();
        let dropped = self.pending.len();
        self.pending.clear();
        self.queued.fetch_sub(dropped, Ordering::AcqRel);
        dropped
    }

    /// Number of undelivered events.
    pub fn len(&mut self) -> usize {
        self.collect();
        self.pending.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    fn collect(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.pending.push_back(event);
        }
    }
}
