//! Concurrent load stress helpers.
//!
//! These helpers hammer a shared pager from several threads and report how
//! the loads were resolved.

use crate::fixtures::TestPager;
use pagefill_core::{LoadOutcome, LoadType};
use pagefill_storage::RecordStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Loads that added records or reached the end.
    pub completed: usize,
    /// Loads that found their direction busy.
    pub coalesced: usize,
    /// Loads that failed.
    pub failed: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Returns the total number of load requests.
    pub fn total(&self) -> usize {
        self.completed + self.coalesced + self.failed
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Load requests: {}", self.total());
        println!("Completed: {}", self.completed);
        println!("Coalesced: {}", self.coalesced);
        println!("Failed: {}", self.failed);
        println!("Duration: {:?}", self.duration);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Load requests issued by each thread.
    pub requests_per_thread: usize,
    /// Directions the threads cycle through.
    pub load_types: Vec<LoadType>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            requests_per_thread: 50,
            load_types: vec![LoadType::Append, LoadType::Prepend, LoadType::Append],
        }
    }
}

/// Issues loads against a shared pager from `config.threads` threads that
/// start together.
pub fn stress_concurrent_loads<S>(pager: Arc<TestPager<S>>, config: &StressConfig) -> StressTestResult
where
    S: RecordStore + 'static,
{
    let completed = Arc::new(AtomicUsize::new(0));
    let coalesced = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let pager = Arc::clone(&pager);
            let completed = Arc::clone(&completed);
            let coalesced = Arc::clone(&coalesced);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let load_types = config.load_types.clone();
            let requests = config.requests_per_thread;

            thread::spawn(move || {
                barrier.wait();
                for i in 0..requests {
                    let load_type = load_types[(t + i) % load_types.len()];
                    match pager.load(load_type) {
                        Ok(LoadOutcome::Coalesced) => coalesced.fetch_add(1, Ordering::Relaxed),
                        Ok(_) => completed.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress thread panicked");
    }

    StressTestResult {
        completed: completed.load(Ordering::Relaxed),
        coalesced: coalesced.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        duration: start.elapsed(),
    }
}
