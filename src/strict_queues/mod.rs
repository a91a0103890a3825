//! Third-party unbounded queues, wrapped so the benchmark can run them next
//! to the blocking queues.

pub mod concurrent_queue;
pub mod crossbeam_queue;
pub mod lockfree_queue;

/// The non-blocking subset of a baseline queue's API.
pub trait BaselineQueue<T> {
    fn push(&self, item: T);

    fn pop(&self) -> Option<T>;
}

/// Per-thread handle over a [`BaselineQueue`].
pub struct BaselineHandle<'q, Q> {
    queue: &'q Q,
}

impl<'q, Q> BaselineHandle<'q, Q> {
    pub fn new(queue: &'q Q) -> Self {
        Self { queue }
    }
}

impl<T, Q: BaselineQueue<T>> crate::Handle<T> for BaselineHandle<'_, Q> {
    fn enqueue(&mut self, item: T) {
        self.queue.push(item);
    }

    fn dequeue(&mut self) -> Option<T> {
        self.queue.pop()
    }
}
