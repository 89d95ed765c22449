//! # Sampler engine
//!
//! Runs a background sampling loop that snapshots every live thread's stack
//! at a fixed interval and merges each stack into that thread's call tree.
//!
//! ## Session lifecycle
//!
//! ```text
//! start() ──► spawn "stackscope-sampler"
//!               │
//!               ├─► tick: provider.snapshot() → forest.record()
//!               ├─► wait interval (or wake-up)
//!               └─► ... until the running flag is cleared
//! stop()  ──► clear flag, wake, join ──► allocate every tree
//! ```
//!
//! `stop()` joins the sampling thread before touching the forest, so the
//! tick in flight always finishes first and the allocation pass never races
//! with a merge.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use super::provider::StackSnapshotProvider;
use crate::domain::SamplerError;
use crate::tree::{ThreadForest, MAX_SCALE};

/// Default time between two ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1);

const SAMPLER_THREAD_NAME: &str = "stackscope-sampler";

type BoxedProvider = Box<dyn StackSnapshotProvider>;

/// Sampler settings. Fixed for the lifetime of a [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Wait between two ticks.
    pub interval: Duration,
    /// Width of each root interval after allocation.
    pub max_scale: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self { interval: DEFAULT_INTERVAL, max_scale: MAX_SCALE }
    }
}

/// Counters for the current (or last) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// Snapshots merged into the forest.
    pub ticks: u64,
    /// Ticks dropped because the provider failed.
    pub skipped_ticks: u64,
    /// Waits cut short by a wake-up while still running.
    pub interrupted_waits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    interrupted_waits: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        self.ticks.store(0, Ordering::Relaxed);
        self.skipped_ticks.store(0, Ordering::Relaxed);
        self.interrupted_waits.store(0, Ordering::Relaxed);
    }

    fn load(&self) -> SamplerStats {
        SamplerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            interrupted_waits: self.interrupted_waits.load(Ordering::Relaxed),
        }
    }
}

/// State of a running session.
struct Session {
    running: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    handle: JoinHandle<BoxedProvider>,
    started: Instant,
}

/// Sampling profiler aggregator.
///
/// Owns its stack provider, its thread forest and its background thread.
/// Only one session runs at a time; a stopped sampler can be started again,
/// which begins a fresh forest.
pub struct Sampler {
    config: SamplerConfig,
    provider: Option<BoxedProvider>,
    forest: Arc<Mutex<ThreadForest>>,
    counters: Arc<Counters>,
    session: Option<Session>,
}

impl Sampler {
    /// Create a sampler with the default interval and scale.
    pub fn new(provider: impl StackSnapshotProvider + 'static) -> Self {
        Self::with_config(provider, SamplerConfig::default())
    }

    pub fn with_config(provider: impl StackSnapshotProvider + 'static, config: SamplerConfig) -> Self {
        Self {
            config,
            provider: Some(Box::new(provider)),
            forest: Arc::new(Mutex::new(ThreadForest::new())),
            counters: Arc::new(Counters::default()),
            session: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a sampling session on a fresh, empty forest.
    ///
    /// # Errors
    /// - [`SamplerError::AlreadyRunning`] if a session is active
    /// - [`SamplerError::ProviderLost`] if an earlier session lost the provider
    /// - [`SamplerError::Spawn`] if the sampling thread cannot be created
    pub fn start(&mut self) -> Result<(), SamplerError> {
        if self.session.is_some() {
            return Err(SamplerError::AlreadyRunning);
        }
        let provider = self.provider.take().ok_or(SamplerError::ProviderLost)?;

        *lock(&self.forest) = ThreadForest::new();
        self.counters.reset();

        let running = Arc::new(AtomicBool::new(true));
        let (wake_tx, wake_rx) = bounded(1);

        let handle = {
            let running = Arc::clone(&running);
            let forest = Arc::clone(&self.forest);
            let counters = Arc::clone(&self.counters);
            let interval = self.config.interval;
            thread::Builder::new()
                .name(SAMPLER_THREAD_NAME.to_string())
                .spawn(move || run_loop(provider, &forest, &counters, &running, &wake_rx, interval))
                .map_err(SamplerError::Spawn)?
        };

        info!(
            "Sampler started (interval {:?}, scale {})",
            self.config.interval, self.config.max_scale
        );
        self.session = Some(Session { running, wake_tx, handle, started: Instant::now() });
        Ok(())
    }

    /// End the session and lay out every thread's tree.
    ///
    /// Blocks until the sampling thread has finished its last tick, then runs
    /// the allocation pass. The laid-out forest is available through
    /// [`Sampler::snapshot`].
    ///
    /// # Errors
    /// - [`SamplerError::NotRunning`] if no session is active
    /// - [`SamplerError::LoopPanicked`] if the sampling thread panicked; the
    ///   ticks merged before that are still laid out
    pub fn stop(&mut self) -> Result<(), SamplerError> {
        if self.session.is_none() {
            return Err(SamplerError::NotRunning);
        }
        // Lay out whatever was merged even if the loop died
        let halted = self.halt();

        let mut forest = lock(&self.forest);
        forest.allocate(self.config.max_scale);

        let elapsed = halted?;
        let stats = self.counters.load();
        info!(
            "Sampler stopped after {:.1}s: {} ticks ({} skipped), {} threads",
            elapsed.as_secs_f64(),
            stats.ticks,
            stats.skipped_ticks,
            forest.len()
        );
        Ok(())
    }

    /// Cut the current wait short so the next tick runs immediately.
    ///
    /// Does nothing when no session is running.
    pub fn wake(&self) {
        if let Some(session) = &self.session {
            // A full channel already holds a pending wake-up
            session.wake_tx.try_send(()).ok();
        }
    }

    /// Copy of the forest as it is right now.
    ///
    /// While running, counts are live and intervals unset; after
    /// [`Sampler::stop`] the copy is fully laid out.
    #[must_use]
    pub fn snapshot(&self) -> ThreadForest {
        lock(&self.forest).clone()
    }

    #[must_use]
    pub fn stats(&self) -> SamplerStats {
        self.counters.load()
    }

    /// Signal the loop, wait for it and take the provider back.
    fn halt(&mut self) -> Result<Duration, SamplerError> {
        let Session { running, wake_tx, handle, started } =
            self.session.take().ok_or(SamplerError::NotRunning)?;

        running.store(false, Ordering::Release);
        wake_tx.try_send(()).ok();

        let provider = handle.join().map_err(|_| SamplerError::LoopPanicked)?;
        self.provider = Some(provider);
        Ok(started.elapsed())
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if self.session.is_some() {
            if let Err(e) = self.halt() {
                warn!("Sampler dropped while running: {e}");
            }
        }
    }
}

fn lock(forest: &Mutex<ThreadForest>) -> MutexGuard<'_, ThreadForest> {
    forest.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Body of the sampling thread. Returns the provider so the sampler can be
/// restarted.
fn run_loop(
    mut provider: BoxedProvider,
    forest: &Mutex<ThreadForest>,
    counters: &Counters,
    running: &AtomicBool,
    wake_rx: &Receiver<()>,
    interval: Duration,
) -> BoxedProvider {
    while running.load(Ordering::Acquire) {
        tick(provider.as_mut(), forest, counters);

        match wake_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) => {
                if running.load(Ordering::Acquire) {
                    counters.interrupted_waits.fetch_add(1, Ordering::Relaxed);
                    debug!("Sampling wait interrupted, continuing");
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Wake channel closed, leaving sampling loop");
                break;
            }
        }
    }
    debug!("Sampling loop exited");
    provider
}

/// One tick: snapshot every thread and merge the stacks.
///
/// A provider that fails or panics costs this tick only.
fn tick(provider: &mut dyn StackSnapshotProvider, forest: &Mutex<ThreadForest>, counters: &Counters) {
    match panic::catch_unwind(AssertUnwindSafe(|| provider.snapshot())) {
        Ok(Ok(stacks)) => {
            lock(forest).record(&stacks);
            counters.ticks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Err(e)) => {
            counters.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            warn!("Skipping sample tick: {e}");
        }
        Err(payload) => {
            counters.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            warn!("Stack provider panicked, skipping sample tick: {}", panic_message(payload.as_ref()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderError;
    use crate::trace_data::{StackFrame, ThreadStack};

    fn one_frame() -> Result<Vec<ThreadStack>, ProviderError> {
        Ok(vec![ThreadStack::new("main", vec![StackFrame::new("app", "run")])])
    }

    #[test]
    fn test_tick_merges_snapshot() {
        let forest = Mutex::new(ThreadForest::new());
        let counters = Counters::default();
        let mut provider = one_frame;
        tick(&mut provider, &forest, &counters);
        tick(&mut provider, &forest, &counters);

        let forest = lock(&forest);
        let main = forest.get("main").expect("main root");
        assert_eq!(main.children()[0].usage.invocation_count, 2);
        assert_eq!(counters.load().ticks, 2);
    }

    #[test]
    fn test_failed_snapshot_skips_tick() {
        let forest = Mutex::new(ThreadForest::new());
        let counters = Counters::default();
        let mut provider = || -> Result<Vec<ThreadStack>, ProviderError> {
            Err(ProviderError::Capture("boom".to_string()))
        };
        tick(&mut provider, &forest, &counters);

        assert!(lock(&forest).is_empty());
        assert_eq!(counters.load(), SamplerStats { ticks: 0, skipped_ticks: 1, interrupted_waits: 0 });
    }

    #[test]
    fn test_panicking_snapshot_skips_tick() {
        let forest = Mutex::new(ThreadForest::new());
        let counters = Counters::default();
        let mut provider = || -> Result<Vec<ThreadStack>, ProviderError> { panic!("walker crashed") };
        tick(&mut provider, &forest, &counters);

        assert_eq!(counters.load(), SamplerStats { ticks: 0, skipped_ticks: 1, interrupted_waits: 0 });
        assert!(lock(&forest).is_empty());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("formatted"));
        assert_eq!(panic_message(payload.as_ref()), "formatted");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn test_stop_without_start() {
        let mut sampler = Sampler::new(one_frame);
        assert!(matches!(sampler.stop(), Err(SamplerError::NotRunning)));
    }

    #[test]
    fn test_default_config() {
        let config = SamplerConfig::default();
        assert_eq!(config.interval, Duration::from_millis(1));
        assert_eq!(config.max_scale, 10_000);
    }
}
