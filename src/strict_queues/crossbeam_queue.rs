use crossbeam_queue::SegQueue;

use super::{BaselineHandle, BaselineQueue};
use crate::{ConcurrentQueue, Handle};

impl<T> BaselineQueue<T> for SegQueue<T> {
    fn push(&self, item: T) {
        SegQueue::push(self, item)
    }

    fn pop(&self) -> Option<T> {
        SegQueue::pop(self)
    }
}

impl<T> ConcurrentQueue<T> for SegQueue<T> {
    fn register(&self) -> impl Handle<T> {
        BaselineHandle::new(self)
    }
}

#[cfg(test)]
mod test {
    use crossbeam_queue::SegQueue;

    use crate::strict_queues::test_support::check_all_items_transfer;

    #[test]
    fn seg_queue_transfers_all_items() {
        check_all_items_transfer(&SegQueue::new());
    }
}
