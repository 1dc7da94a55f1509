//! Bounded FIFO queue shared by producers and the worker pool
//!
//! - `try_push` never blocks: a full or closed queue hands the message back
//! - `pop` suspends until a message arrives or the queue is closed and empty
//! - `close` is permanent and wakes every waiting consumer

use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Notify;

/// Rejected push, carrying the message back to the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("queue is full")]
    Full(String),

    #[error("queue is closed")]
    Closed(String),
}

impl PushError {
    pub fn into_message(self) -> String {
        match self {
            PushError::Full(message) | PushError::Closed(message) => message,
        }
    }
}

#[derive(Debug)]
struct QueueState {
    items: VecDeque<String>,
    closed: bool,
    high_water_mark: usize,
}

/// Fixed-capacity multi-producer multi-consumer queue of messages
#[derive(Debug)]
pub struct BoundedQueue {
    state: Mutex<QueueState>,
    capacity: usize,
    available: Notify,
}

impl BoundedQueue {
    /// Create a queue holding at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
                high_water_mark: 0,
            }),
            capacity,
            available: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of buffered messages
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Largest occupancy ever observed
    pub fn high_water_mark(&self) -> usize {
        self.state.lock().high_water_mark
    }

    /// Enqueue without waiting
    pub fn try_push(&self, message: String) -> Result<(), PushError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PushError::Closed(message));
            }
            if state.items.len() >= self.capacity {
                return Err(PushError::Full(message));
            }
            state.items.push_back(message);
            state.high_water_mark = state.high_water_mark.max(state.items.len());
        }
        self.available.notify_one();
        Ok(())
    }

    /// Wait for the next message.
    ///
    /// Returns `None` once the queue is closed and nothing is left to hand out.
    /// Cancel-safe: dropping the future never loses a message.
    pub async fn pop(&self) -> Option<String> {
        loop {
            // Register interest before checking so a close() between the
            // check and the await still wakes us.
            let notified = self.available.notified();
            {
                let mut state = self.state.lock();
                if let Some(message) = state.items.pop_front() {
                    return Some(message);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Remove and return every buffered message in FIFO order
    pub fn drain(&self) -> Vec<String> {
        self.state.lock().items.drain(..).collect()
    }

    /// Seal the queue. Buffered messages stay available to `pop` and `drain`.
    ///
    /// Returns false if the queue was already closed.
    pub fn close(&self) -> bool {
        let newly_closed = {
            let mut state = self.state.lock();
            !std::mem::replace(&mut state.closed, true)
        };
        if newly_closed {
            self.available.notify_waiters();
        }
        newly_closed
    }
}
