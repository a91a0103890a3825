//! Two-lock linked queue.
//!
//! The chain always ends in an empty sentinel node. `head` points at the
//! oldest node and is only touched under the head lock; `tail` points at the
//! sentinel and is only touched under the tail lock, together with the
//! sentinel's contents. A push fills the sentinel and appends a fresh one, a
//! pop detaches the head node, so producers and consumers work on different
//! nodes unless the queue is empty (`head == tail`).
//!
//! Lock order is head before tail. The tail lock is never held while the head
//! lock is being acquired.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
#[cfg(not(loom))]
use std::time::{Duration, Instant};

use crate::sync::{self, AtomicUsize, Condvar, Mutex, MutexGuard, Ordering};
#[cfg(not(loom))]
use crate::PopTimeoutError;
use crate::{ConcurrentQueue, Handle};

use super::node::Node;
use super::{BlockingQueue, QueueHandle};

type Link<T> = NonNull<Node<T>>;

/// Unbounded FIFO queue with independent head and tail locks.
///
/// Pushes serialize on the tail lock, pops on the head lock. A consumer only
/// peeks at the tail (briefly taking the tail lock) to decide whether the
/// queue is empty.
pub struct FineGrainedQueue<T> {
    head: Mutex<Link<T>>,
    tail: Mutex<Link<T>>,
    /// Incremented under the tail lock, decremented under the head lock.
    count: AtomicUsize,
    /// Consumers registered under the head lock that are waiting, or about
    /// to wait, on `data_cond`.
    parked: AtomicUsize,
    /// Paired with the head lock.
    data_cond: Condvar,
    _owns: PhantomData<Box<Node<T>>>,
}

// The raw links are only dereferenced under the lock that owns that end of
// the chain, and payloads move between threads by value.
unsafe impl<T: Send> Send for FineGrainedQueue<T> {}
unsafe impl<T: Send> Sync for FineGrainedQueue<T> {}

/// Deregisters a parked consumer on every exit path of a wait.
struct ParkedGuard<'a>(&'a AtomicUsize);

impl<'a> ParkedGuard<'a> {
    fn register(parked: &'a AtomicUsize) -> Self {
        parked.fetch_add(1, Ordering::SeqCst);
        Self(parked)
    }
}

impl Drop for ParkedGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T> FineGrainedQueue<T> {
    pub fn new() -> Self {
        let sentinel = Node::sentinel();
        Self {
            head: Mutex::new(sentinel),
            tail: Mutex::new(sentinel),
            count: AtomicUsize::new(0),
            parked: AtomicUsize::new(0),
            data_cond: Condvar::new(),
            _owns: PhantomData,
        }
    }

    pub fn push(&self, value: T) {
        let new_sentinel = Node::sentinel();
        {
            let mut tail = sync::lock(&self.tail);
            // SAFETY: the tail node is only reachable for mutation by the
            // tail lock holder; consumers never touch it while head == tail.
            unsafe { (*tail.as_ptr()).install(value, new_sentinel) };
            *tail = new_sentinel;
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        self.wake_one();
    }

    /// Blocks until an item is available and removes it.
    ///
    /// Never returns if nothing is pushed; see
    /// [`wait_and_pop_timeout`](Self::wait_and_pop_timeout).
    pub fn wait_and_pop(&self) -> T {
        let mut head = self.lock_head();
        if self.is_empty_at(&head) {
            let _parked = ParkedGuard::register(&self.parked);
            while self.is_empty_at(&head) {
                head = sync::wait(&self.data_cond, head);
            }
        }
        self.pop_head(head)
    }

    #[cfg(not(loom))]
    pub fn wait_and_pop_timeout(&self, timeout: Duration) -> Result<T, PopTimeoutError> {
        // An unrepresentable deadline waits like `wait_and_pop`.
        let deadline = Instant::now().checked_add(timeout);
        let mut head = self.lock_head();
        if self.is_empty_at(&head) {
            let _parked = ParkedGuard::register(&self.parked);
            while self.is_empty_at(&head) {
                let Some(deadline) = deadline else {
                    head = sync::wait(&self.data_cond, head);
                    continue;
                };
                let remaining = deadline
                    .checked_duration_since(Instant::now())
                    .filter(|remaining| !remaining.is_zero())
                    .ok_or(PopTimeoutError { timeout })?;
                (head, _) = sync::wait_timeout(&self.data_cond, head, remaining);
            }
        }
        Ok(self.pop_head(head))
    }

    pub fn try_pop(&self) -> Option<T> {
        let head = self.lock_head();
        if self.is_empty_at(&head) {
            return None;
        }
        Some(self.pop_head(head))
    }

    pub fn len(&self) -> usize {
        let _head = self.lock_head();
        let _tail = sync::lock(&self.tail);
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        let head = self.lock_head();
        self.is_empty_at(&head)
    }

    fn lock_head(&self) -> MutexGuard<'_, Link<T>> {
        sync::lock(&self.head)
    }

    /// Reads the current tail pointer under the tail lock. Callers hold the
    /// head lock, which keeps the head-then-tail order.
    fn tail_snapshot(&self) -> Link<T> {
        *sync::lock(&self.tail)
    }

    fn is_empty_at(&self, head: &MutexGuard<'_, Link<T>>) -> bool {
        **head == self.tail_snapshot()
    }

    /// Detaches the head node and returns its payload.
    ///
    /// The caller has observed `head != tail` while holding `head`.
    fn pop_head(&self, mut head: MutexGuard<'_, Link<T>>) -> T {
        // SAFETY: head != tail, so no producer can reach the head node and we
        // hold the only lock that can. The tail lock acquisition that showed
        // head != tail synchronized with the push that filled it.
        let detached = unsafe { Node::detach(*head) };
        let (Some(value), Some(next)) = detached else {
            unreachable!("node before the tail sentinel without payload or successor");
        };
        *head = next;
        self.count.fetch_sub(1, Ordering::SeqCst);
        value
    }

    /// Wakes one consumer, if any is parked.
    ///
    /// A consumer registers as parked under the head lock before the emptiness
    /// check that precedes each of its waits. Taking the head lock here, after
    /// the tail lock has been released, makes sure it is either already
    /// waiting on the condvar or will see the new item when it re-checks.
    fn wake_one(&self) {
        if self.parked.load(Ordering::SeqCst) == 0 {
            return;
        }
        drop(self.lock_head());
        self.data_cond.notify_one();
    }

    #[cfg(all(test, not(loom)))]
    fn parked_consumers(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    /// Walks the chain from head to tail and checks the structural invariants.
    /// Must not race with other operations.
    #[cfg(all(test, not(loom)))]
    fn assert_invariants(&self) {
        let head = self.lock_head();
        let tail = sync::lock(&self.tail);
        let mut cursor = *head;
        let mut holding = 0;
        while cursor != *tail {
            // SAFETY: both locks are held.
            let node = unsafe { cursor.as_ref() };
            assert!(node.slot.is_holding(), "node before the tail is empty");
            cursor = node.next.expect("tail not reachable from head");
            holding += 1;
        }
        // SAFETY: both locks are held.
        let sentinel = unsafe { tail.as_ref() };
        assert!(!sentinel.slot.is_holding(), "tail sentinel holds a payload");
        assert!(sentinel.next.is_none(), "tail sentinel has a successor");
        assert_eq!(holding, self.count.load(Ordering::SeqCst));
    }
}

impl<T> Drop for FineGrainedQueue<T> {
    fn drop(&mut self) {
        let head = *sync::lock(&self.head);
        // SAFETY: `&mut self` rules out any other access to the chain.
        unsafe { Node::drop_chain(head) };
    }
}

impl<T> Default for FineGrainedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FineGrainedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FineGrainedQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Send> BlockingQueue<T> for FineGrainedQueue<T> {
    fn push(&self, value: T) {
        FineGrainedQueue::push(self, value);
    }

    fn wait_and_pop(&self) -> T {
        FineGrainedQueue::wait_and_pop(self)
    }

    #[cfg(not(loom))]
    fn wait_and_pop_timeout(&self, timeout: Duration) -> Result<T, PopTimeoutError> {
        FineGrainedQueue::wait_and_pop_timeout(self, timeout)
    }

    fn try_pop(&self) -> Option<T> {
        FineGrainedQueue::try_pop(self)
    }

    fn len(&self) -> usize {
        FineGrainedQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        FineGrainedQueue::is_empty(self)
    }
}

impl<T: Send> ConcurrentQueue<T> for FineGrainedQueue<T> {
    fn register(&self) -> impl Handle<T> {
        QueueHandle::new(self)
    }
}
