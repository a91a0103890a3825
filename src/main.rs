use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use threadsafe_queues::{
    BlockingQueue, CoarseQueue, ConcurrentQueue, FineGrainedQueue, Handle,
};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

/// How long a blocking consumer waits before re-checking whether the run is over.
const BLOCKING_POLL: Duration = Duration::from_millis(10);

fn main() {
    let config = BenchConfig::parse();
    if config.blocking && !config.queue.is_blocking() {
        BenchConfig::command()
            .error(
                ErrorKind::ArgumentConflict,
                "--blocking needs a blocking queue (coarse or fine-grained)",
            )
            .exit();
    }

    let report = match config.queue {
        QueueKind::Coarse => run_blocking(CoarseQueue::new(), &config),
        QueueKind::FineGrained => run_blocking(FineGrainedQueue::new(), &config),
        QueueKind::SegQueue => {
            benchmark_producer_consumer(crossbeam_queue::SegQueue::new(), &config)
        }
        QueueKind::ConcurrentQueue => benchmark_producer_consumer(
            concurrent_queue::ConcurrentQueue::unbounded(),
            &config,
        ),
        QueueKind::Lockfree => {
            benchmark_producer_consumer(lockfree::queue::Queue::new(), &config)
        }
    };
    report.print(&config);
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct BenchConfig {
    /// queue implementation to benchmark.
    #[arg(long, value_enum, default_value_t = QueueKind::FineGrained)]
    queue: QueueKind,
    /// number of elements to add to the queue before starting the main
    /// threaded test.
    #[arg(long, default_value_t = 0)]
    prefill: usize,
    /// number of threads pushing elements onto the queue.
    #[arg(long)]
    producer_threads: usize,
    /// number of threads popping elements off the queue.
    #[arg(long)]
    consumer_threads: usize,
    /// duration in seconds to run the test
    #[arg(long)]
    duration: usize,
    /// consumers use the blocking pop (with a short timeout so they notice the
    /// end of the run) instead of try_pop.
    #[arg(long)]
    blocking: bool,
    /// pin every worker thread to its own core.
    #[arg(long)]
    pin_threads: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QueueKind {
    Coarse,
    FineGrained,
    SegQueue,
    ConcurrentQueue,
    Lockfree,
}

impl QueueKind {
    fn is_blocking(self) -> bool {
        matches!(self, QueueKind::Coarse | QueueKind::FineGrained)
    }
}

struct Report {
    enqueues: usize,
    dequeues: usize,
}

impl Report {
    fn print(&self, config: &BenchConfig) {
        println!(
            "throughput: {}",
            (self.enqueues + self.dequeues) as f64 / config.duration as f64
        );
        println!("number of enqueues: {}", self.enqueues);
        println!("number of dequeues: {}", self.dequeues);
    }
}

fn run_blocking<Q>(queue: Q, config: &BenchConfig) -> Report
where
    Q: ConcurrentQueue<i32> + BlockingQueue<i32> + Sync,
{
    if config.blocking {
        benchmark_blocking_consumers(queue, config)
    } else {
        benchmark_producer_consumer(queue, config)
    }
}

/// Hands out core ids to worker threads when pinning is enabled.
struct CorePinner {
    cores: Vec<core_affinity::CoreId>,
    next: AtomicUsize,
}

impl CorePinner {
    fn new(enabled: bool) -> Self {
        let cores = if enabled {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };
        Self {
            cores,
            next: AtomicUsize::new(0),
        }
    }

    fn pin_current(&self) {
        if self.cores.is_empty() {
            return;
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.cores.len();
        core_affinity::set_for_current(self.cores[i]);
    }
}

fn benchmark_producer_consumer<C>(queue: C, config: &BenchConfig) -> Report
where
    C: ConcurrentQueue<i32> + Sync,
{
    run_timed(&queue, config, |handle, done| {
        let mut local_dequeues = 0;
        while !done.load(Ordering::Relaxed) {
            handle.dequeue();
            local_dequeues += 1;
        }
        local_dequeues
    })
}

fn benchmark_blocking_consumers<Q>(queue: Q, config: &BenchConfig) -> Report
where
    Q: ConcurrentQueue<i32> + BlockingQueue<i32> + Sync,
{
    let queue = &queue;
    run_timed(queue, config, |_handle, done| {
        let mut local_dequeues = 0;
        while !done.load(Ordering::Relaxed) {
            if queue.wait_and_pop_timeout(BLOCKING_POLL).is_ok() {
                local_dequeues += 1;
            }
        }
        local_dequeues
    })
}

/// Prefills `queue`, runs the producers and the given consumer loop for the
/// configured duration and sums up the per-thread counts.
fn run_timed<C, F>(queue: &C, config: &BenchConfig, consume: F) -> Report
where
    C: ConcurrentQueue<i32> + Sync,
    F: Fn(&mut dyn Handle<i32>, &AtomicBool) -> usize + Sync,
{
    let mut handle = queue.register();
    for i in 0..config.prefill {
        handle.enqueue(i as i32);
    }

    let done: AtomicBool = AtomicBool::new(false);
    let enqueues = AtomicUsize::new(0);
    let dequeues = AtomicUsize::new(0);
    let pinner = CorePinner::new(config.pin_threads);

    thread::scope(|s| {
        for _ in 0..config.producer_threads {
            s.spawn(|| {
                pinner.pin_current();
                let mut local_enqueues = 0;
                let mut handle = queue.register();
                while !done.load(Ordering::Relaxed) {
                    handle.enqueue(405);
                    local_enqueues += 1;
                }
                enqueues.fetch_add(local_enqueues, Ordering::Relaxed);
            });
        }
        for _ in 0..config.consumer_threads {
            s.spawn(|| {
                pinner.pin_current();
                let mut handle = queue.register();
                let local_dequeues = consume(&mut handle, &done);
                dequeues.fetch_add(local_dequeues, Ordering::Relaxed);
            });
        }

        std::thread::sleep(Duration::from_secs(config.duration as u64));
        done.store(true, Ordering::Relaxed);
    });

    Report {
        enqueues: enqueues.into_inner(),
        dequeues: dequeues.into_inner(),
    }
}
