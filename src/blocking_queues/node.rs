use std::ptr::NonNull;

/// Payload cell of a [`Node`]. Only the trailing sentinel is `Empty`.
pub(crate) enum Slot<T> {
    Empty,
    Holding(T),
}

impl<T> Slot<T> {
    pub(crate) fn is_holding(&self) -> bool {
        matches!(self, Slot::Holding(_))
    }
}

/// A cell of the singly linked chain behind
/// [`FineGrainedQueue`](super::fine_grained_queue::FineGrainedQueue).
///
/// Every node is heap allocated and owns its successor: `next` was produced
/// by `Box::leak` and is turned back into a `Box` exactly once, in
/// [`Node::detach`] or when the chain is dropped. Raw pointers are used for
/// the links because the tail lock holder writes into the last node while the
/// chain is owned from the head side.
pub(crate) struct Node<T> {
    pub(crate) slot: Slot<T>,
    pub(crate) next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    /// Allocates a new empty sentinel.
    pub(crate) fn sentinel() -> NonNull<Node<T>> {
        let node = Box::new(Node {
            slot: Slot::Empty,
            next: None,
        });
        NonNull::from(Box::leak(node))
    }

    /// Turns this sentinel into a holding node followed by `next`, which
    /// becomes the new sentinel.
    pub(crate) fn install(&mut self, value: T, next: NonNull<Node<T>>) {
        debug_assert!(!self.slot.is_holding(), "installing into a holding node");
        debug_assert!(self.next.is_none(), "sentinel already has a successor");
        self.slot = Slot::Holding(value);
        self.next = Some(next);
    }

    /// Takes ownership of `node` back from the chain, frees it and returns its
    /// payload together with its successor.
    ///
    /// # Safety
    ///
    /// `node` must come from [`Node::sentinel`], must not be reachable by any
    /// other thread, and must not be used again afterwards.
    pub(crate) unsafe fn detach(node: NonNull<Node<T>>) -> (Option<T>, Option<NonNull<Node<T>>>) {
        let node = Box::from_raw(node.as_ptr());
        let Node { slot, next } = *node;
        let value = match slot {
            Slot::Holding(value) => Some(value),
            Slot::Empty => None,
        };
        (value, next)
    }

    /// Frees `first` and every node after it, iteratively.
    ///
    /// # Safety
    ///
    /// Same as [`Node::detach`], for the whole chain starting at `first`.
    pub(crate) unsafe fn drop_chain(first: NonNull<Node<T>>) {
        let mut cursor = Some(first);
        while let Some(node) = cursor {
            let (_, next) = Node::detach(node);
            cursor = next;
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::{Node, Slot};

    #[test]
    fn install_then_detach_returns_payload_and_successor() {
        let first = Node::sentinel();
        let second = Node::sentinel();
        unsafe {
            (*first.as_ptr()).install(7, second);
            let (value, next) = Node::detach(first);
            assert_eq!(value, Some(7));
            assert_eq!(next, Some(second));
            assert!(!(*second.as_ptr()).slot.is_holding());
            let (value, next) = Node::detach(second);
            assert_eq!(value, None);
            assert!(next.is_none());
        }
    }

    #[test]
    fn drop_chain_releases_every_payload() {
        let payload = Rc::new(());
        let head = Node::sentinel();
        let mut tail = head;
        for _ in 0..10 {
            let next = Node::sentinel();
            unsafe { (*tail.as_ptr()).install(Rc::clone(&payload), next) };
            tail = next;
        }
        assert_eq!(Rc::strong_count(&payload), 11);
        unsafe { Node::drop_chain(head) };
        assert_eq!(Rc::strong_count(&payload), 1);
    }

    #[test]
    fn slot_tags() {
        assert!(Slot::Holding(1).is_holding());
        assert!(!Slot::<i32>::Empty.is_holding());
    }
}
