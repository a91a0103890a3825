//! Unbounded FIFO queues for handing work between threads, with blocking and
//! non-blocking pops.
//!
//! - [`CoarseQueue`](coarse_queue::CoarseQueue): one mutex around a `VecDeque`.
//! - [`FineGrainedQueue`](fine_grained_queue::FineGrainedQueue): a linked list
//!   with separate head and tail locks, so a producer and a consumer only meet
//!   when the queue is empty.

pub mod coarse_queue;
pub mod fine_grained_queue;
mod node;

#[cfg(not(loom))]
use std::time::Duration;

#[cfg(not(loom))]
use crate::PopTimeoutError;

/// Operations shared by both blocking queue variants.
pub trait BlockingQueue<T> {
    /// Appends `value` and wakes at most one blocked consumer.
    fn push(&self, value: T);

    /// Removes the front item, blocking until one is available.
    ///
    /// There is no timeout: if nothing is ever pushed this never returns. Use
    /// [`wait_and_pop_timeout`](Self::wait_and_pop_timeout) for a bounded wait.
    fn wait_and_pop(&self) -> T;

    /// Like [`wait_and_pop`](Self::wait_and_pop), but gives up after `timeout`.
    #[cfg(not(loom))]
    fn wait_and_pop_timeout(&self, timeout: Duration) -> Result<T, PopTimeoutError>;

    /// Removes the front item if there is one, without blocking.
    fn try_pop(&self) -> Option<T>;

    /// Number of items currently queued. Only a snapshot under concurrency.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool;
}

/// Per-thread handle over any [`BlockingQueue`]; the queues need no thread
/// local state, so this is just a reference.
pub struct QueueHandle<'q, Q> {
    queue: &'q Q,
}

impl<'q, Q> QueueHandle<'q, Q> {
    pub fn new(queue: &'q Q) -> Self {
        Self { queue }
    }
}

impl<T, Q: BlockingQueue<T>> crate::Handle<T> for QueueHandle<'_, Q> {
    fn enqueue(&mut self, item: T) {
        self.queue.push(item);
    }

    fn dequeue(&mut self) -> Option<T> {
        self.queue.try_pop()
    }
}
