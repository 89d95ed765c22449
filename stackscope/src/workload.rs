//! Instrumented demo workload for `stackscope demo`
//!
//! Spawns worker threads that register with a [`ShadowStacks`] registry and
//! spin through a small, uneven call graph so the sampler has something
//! realistic to look at:
//!
//! ```text
//! demo::Worker::run
//! ├── demo::Parser::parse
//! │   └── demo::Parser::next_token      (heaviest)
//! └── demo::Checksum::update
//! ```

use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

use crate::profiling::{ShadowStacks, ThreadHandle};

/// Running demo workers. Call [`DemoWorkload::stop`] to join them.
pub struct DemoWorkload {
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<u64>>,
}

impl DemoWorkload {
    /// Spawn `threads` workers named `worker-0`, `worker-1`, ...
    ///
    /// # Errors
    /// Returns an error if a worker thread cannot be spawned.
    pub fn spawn(stacks: &ShadowStacks, threads: usize) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let mut workers = Vec::with_capacity(threads);

        for index in 0..threads {
            let name = format!("worker-{index}");
            let stacks = stacks.clone();
            let worker_running = Arc::clone(&running);
            let handle = thread::Builder::new().name(name.clone()).spawn(move || {
                let thread = stacks.register(name);
                worker_loop(&thread, &worker_running)
            });
            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Don't leave already-started workers spinning
                    running.store(false, Ordering::Release);
                    for worker in workers {
                        worker.join().ok();
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self { running, workers })
    }

    /// Stop every worker and wait for it. Returns the rounds completed.
    #[must_use]
    pub fn stop(self) -> u64 {
        self.running.store(false, Ordering::Release);
        self.workers.into_iter().filter_map(|w| w.join().ok()).sum()
    }
}

fn worker_loop(thread: &ThreadHandle, running: &AtomicBool) -> u64 {
    let _run = thread.enter("demo::Worker", "run");
    let mut rounds = 0u64;
    let mut state = 0x9e37_79b9_u64;

    while running.load(Ordering::Acquire) {
        {
            let _parse = thread.enter("demo::Parser", "parse");
            spin(&mut state, 200);
            let _token = thread.enter("demo::Parser", "next_token");
            spin(&mut state, 2_000);
        }
        {
            let _update = thread.enter("demo::Checksum", "update");
            spin(&mut state, 600);
        }
        rounds += 1;
    }
    debug!("Demo worker finished after {rounds} rounds");
    rounds
}

fn spin(state: &mut u64, iterations: u32) {
    for _ in 0..iterations {
        *state = black_box(state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1));
    }
}
