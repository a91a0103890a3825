use lockfree::queue::Queue;

use super::{BaselineHandle, BaselineQueue};
use crate::{ConcurrentQueue, Handle};

impl<T> BaselineQueue<T> for Queue<T> {
    fn push(&self, item: T) {
        Queue::push(self, item)
    }

    fn pop(&self) -> Option<T> {
        Queue::pop(self)
    }
}

impl<T> ConcurrentQueue<T> for Queue<T> {
    fn register(&self) -> impl Handle<T> {
        BaselineHandle::new(self)
    }
}

#[cfg(test)]
mod test {
    use lockfree::queue::Queue;

    use crate::strict_queues::test_support::check_all_items_transfer;

    #[test]
    fn lockfree_queue_transfers_all_items() {
        check_all_items_transfer(&Queue::new());
    }
}
