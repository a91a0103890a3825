use std::collections::VecDeque;
use std::fmt;
#[cfg(not(loom))]
use std::time::{Duration, Instant};

#[cfg(all(test, not(loom)))]
use crate::sync::{AtomicUsize, Ordering};
use crate::sync::{self, Condvar, Mutex, MutexGuard};
#[cfg(not(loom))]
use crate::PopTimeoutError;
use crate::{ConcurrentQueue, Handle};

use super::{BlockingQueue, QueueHandle};

/// Unbounded FIFO queue guarded by a single mutex.
///
/// Every operation serializes on the same lock. Each push wakes at most one
/// consumer blocked in [`wait_and_pop`](Self::wait_and_pop).
pub struct CoarseQueue<T> {
    items: Mutex<VecDeque<T>>,
    data_cond: Condvar,
    /// Consumers currently inside a condvar wait.
    #[cfg(all(test, not(loom)))]
    waiting: AtomicUsize,
}

impl<T> CoarseQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            data_cond: Condvar::new(),
            #[cfg(all(test, not(loom)))]
            waiting: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, value: T) {
        sync::lock(&self.items).push_back(value);
        self.data_cond.notify_one();
    }

    /// Blocks until an item is available and removes it.
    pub fn wait_and_pop(&self) -> T {
        let mut items = sync::lock(&self.items);
        loop {
            if let Some(value) = items.pop_front() {
                return value;
            }
            items = self.wait(items, None);
        }
    }

    #[cfg(not(loom))]
    pub fn wait_and_pop_timeout(&self, timeout: Duration) -> Result<T, PopTimeoutError> {
        // An unrepresentable deadline waits like `wait_and_pop`.
        let deadline = Instant::now().checked_add(timeout);
        let mut items = sync::lock(&self.items);
        loop {
            if let Some(value) = items.pop_front() {
                return Ok(value);
            }
            let remaining = match deadline {
                Some(deadline) => Some(
                    deadline
                        .checked_duration_since(Instant::now())
                        .filter(|remaining| !remaining.is_zero())
                        .ok_or(PopTimeoutError { timeout })?,
                ),
                None => None,
            };
            items = self.wait(items, remaining);
        }
    }

    /// Waits on the condvar, for at most `limit` when given.
    fn wait<'a>(
        &self,
        items: MutexGuard<'a, VecDeque<T>>,
        #[cfg_attr(loom, allow(unused_variables))] limit: Option<std::time::Duration>,
    ) -> MutexGuard<'a, VecDeque<T>> {
        #[cfg(all(test, not(loom)))]
        self.waiting.fetch_add(1, Ordering::SeqCst);
        #[cfg(not(loom))]
        let items = match limit {
            Some(limit) => sync::wait_timeout(&self.data_cond, items, limit).0,
            None => sync::wait(&self.data_cond, items),
        };
        #[cfg(loom)]
        let items = sync::wait(&self.data_cond, items);
        #[cfg(all(test, not(loom)))]
        self.waiting.fetch_sub(1, Ordering::SeqCst);
        items
    }

    #[cfg(all(test, not(loom)))]
    fn waiting_consumers(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn try_pop(&self) -> Option<T> {
        sync::lock(&self.items).pop_front()
    }

    pub fn len(&self) -> usize {
        sync::lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        sync::lock(&self.items).is_empty()
    }
}

impl<T> Default for CoarseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CoarseQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoarseQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Send> BlockingQueue<T> for CoarseQueue<T> {
    fn push(&self, value: T) {
        CoarseQueue::push(self, value);
    }

    fn wait_and_pop(&self) -> T {
        CoarseQueue::wait_and_pop(self)
    }

    #[cfg(not(loom))]
    fn wait_and_pop_timeout(&self, timeout: Duration) -> Result<T, PopTimeoutError> {
        CoarseQueue::wait_and_pop_timeout(self, timeout)
    }

    fn try_pop(&self) -> Option<T> {
        CoarseQueue::try_pop(self)
    }

    fn len(&self) -> usize {
        CoarseQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        CoarseQueue::is_empty(self)
    }
}

impl<T: Send> ConcurrentQueue<T> for CoarseQueue<T> {
    fn register(&self) -> impl Handle<T> {
        QueueHandle::new(self)
    }
}

#[cfg(all(test, not(loom)))]
mod test {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use super::CoarseQueue;
    use crate::{ConcurrentQueue, Handle, PopTimeoutError};

    #[test]
    fn empty_queue_contract() {
        let queue = CoarseQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
        queue.push("x");
        assert!(!queue.is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.try_pop(), Some("x"));
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn fifo_single_producer_single_consumer() {
        let queue = CoarseQueue::new();
        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..1000 {
                    queue.push(i);
                }
            });
            s.spawn(|| {
                for i in 0..1000 {
                    assert_eq!(queue.wait_and_pop(), i);
                }
            });
        });
        assert!(queue.is_empty());
    }

    #[test]
    fn handle_enqueue_dequeue() {
        let queue = CoarseQueue::new();
        let mut handle = queue.register();
        for i in 0..5 {
            handle.enqueue(i);
        }
        for i in 0..5 {
            assert_eq!(handle.dequeue(), Some(i));
        }
        assert_eq!(handle.dequeue(), None);
    }

    #[test]
    fn blocked_consumer_waits_for_push() {
        let queue = CoarseQueue::new();
        let barrier = Barrier::new(2);
        let returned = AtomicBool::new(false);
        thread::scope(|s| {
            s.spawn(|| {
                barrier.wait();
                let value = queue.wait_and_pop();
                returned.store(true, Ordering::SeqCst);
                assert_eq!(value, 42);
            });
            barrier.wait();
            while queue.waiting_consumers() == 0 {
                thread::yield_now();
            }
            assert!(!returned.load(Ordering::SeqCst));
            queue.push(42);
        });
        assert!(returned.into_inner());
        assert_eq!(queue.waiting_consumers(), 0);
    }

    #[test]
    fn one_push_releases_exactly_one_of_many_waiters() {
        let queue = CoarseQueue::new();
        let released = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    let v = queue.wait_and_pop();
                    released.fetch_add(1, Ordering::SeqCst);
                    v
                });
            }
            while queue.waiting_consumers() < 3 {
                thread::yield_now();
            }
            queue.push(1);
            let start = Instant::now();
            while released.load(Ordering::SeqCst) == 0 {
                assert!(start.elapsed() < Duration::from_secs(10));
                thread::yield_now();
            }
            thread::sleep(Duration::from_millis(50));
            assert_eq!(released.load(Ordering::SeqCst), 1);
            queue.push(2);
            queue.push(3);
        });
        assert_eq!(released.into_inner(), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn max_timeout_pops_available_item() {
        let queue = CoarseQueue::new();
        queue.push(8);
        assert_eq!(queue.wait_and_pop_timeout(Duration::MAX), Ok(8));
    }

    #[test]
    fn max_timeout_waits_for_push() {
        let queue = CoarseQueue::new();
        thread::scope(|s| {
            s.spawn(|| {
                while queue.waiting_consumers() == 0 {
                    thread::yield_now();
                }
                queue.push(4);
            });
            assert_eq!(queue.wait_and_pop_timeout(Duration::MAX), Ok(4));
        });
    }

    #[test]
    fn timeout_on_empty_queue() {
        let queue = CoarseQueue::<u32>::new();
        let timeout = Duration::from_millis(30);
        let start = Instant::now();
        assert_eq!(
            queue.wait_and_pop_timeout(timeout),
            Err(PopTimeoutError { timeout })
        );
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn timeout_pop_receives_concurrent_push() {
        let queue = CoarseQueue::new();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(20));
                queue.push(9);
            });
            assert_eq!(queue.wait_and_pop_timeout(Duration::from_secs(10)), Ok(9));
        });
    }

    #[test]
    fn count_conservation_many_threads() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 500;
        let queue = CoarseQueue::new();
        let collected = Mutex::new(Vec::new());
        thread::scope(|s| {
            for p in 0..PRODUCERS {
                let queue = &queue;
                s.spawn(move || {
                    for i in (p * PER_PRODUCER)..((p + 1) * PER_PRODUCER) {
                        queue.push(i);
                    }
                });
            }
            for _ in 0..PRODUCERS {
                s.spawn(|| {
                    let mut local = Vec::with_capacity(PER_PRODUCER);
                    for _ in 0..PER_PRODUCER {
                        local.push(queue.wait_and_pop());
                    }
                    collected.lock().unwrap().extend(local);
                });
            }
        });
        let mut collected = collected.into_inner().unwrap();
        collected.sort_unstable();
        assert_eq!(collected, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }
}
