pub mod blocking_queues;
pub mod error;
pub mod strict_queues;
mod sync;

pub use blocking_queues::{
    coarse_queue::CoarseQueue, fine_grained_queue::FineGrainedQueue, BlockingQueue,
};
pub use error::PopTimeoutError;

pub trait ConcurrentQueue<T> {
    /// Returns a thread handle to the queue, which can be used for enqueues and dequeues
    fn register(&self) -> impl Handle<T>;
}

pub trait Handle<T> {
    fn enqueue(&mut self, item: T);

    /// Non-blocking dequeue, `None` when the queue is observed empty.
    fn dequeue(&mut self) -> Option<T>;
}
