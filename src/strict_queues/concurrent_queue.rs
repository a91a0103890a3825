use super::{BaselineHandle, BaselineQueue};
use crate::{ConcurrentQueue, Handle};

/// Only the unbounded flavour is used, so `push` cannot fail with `Full`;
/// the queue is never closed either.
impl<T> BaselineQueue<T> for concurrent_queue::ConcurrentQueue<T> {
    fn push(&self, item: T) {
        let _ = concurrent_queue::ConcurrentQueue::push(self, item);
    }

    fn pop(&self) -> Option<T> {
        concurrent_queue::ConcurrentQueue::pop(self).ok()
    }
}

impl<T> ConcurrentQueue<T> for concurrent_queue::ConcurrentQueue<T> {
    fn register(&self) -> impl Handle<T> {
        BaselineHandle::new(self)
    }
}
