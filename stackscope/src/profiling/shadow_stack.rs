//! In-process stack capture through explicit instrumentation
//!
//! Rust cannot portably walk another thread's stack, so instrumented code
//! keeps a shadow stack instead: each thread registers once and pushes a
//! frame per instrumented call through an RAII guard.
//!
//! ```ignore
//! let stacks = ShadowStacks::new();
//! let worker = stacks.clone();
//! std::thread::spawn(move || {
//!     let thread = worker.register("worker-1");
//!     let _run = thread.enter("app::Worker", "run");
//!     let _step = thread.enter("app::Worker", "step");
//!     // ...
//! });
//! let sampler = Sampler::new(stacks);
//! ```
//!
//! Each registered thread owns its own frame list, so pushing and popping
//! never contends with other workers, only (briefly) with the sampler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::provider::StackSnapshotProvider;
use crate::domain::ProviderError;
use crate::trace_data::{StackFrame, ThreadStack};

type Frames = Mutex<Vec<StackFrame>>;

#[derive(Debug)]
struct RegisteredThread {
    name: String,
    frames: Weak<Frames>,
}

/// Registry of instrumented threads. Clones share the same registry.
///
/// Thread names are expected to be unique; two live threads registered
/// under one name end up merged into one call tree.
#[derive(Debug, Clone, Default)]
pub struct ShadowStacks {
    threads: Arc<Mutex<Vec<RegisteredThread>>>,
}

impl ShadowStacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the calling thread under `name`.
    ///
    /// The thread counts as live until the returned handle is dropped.
    #[must_use]
    pub fn register(&self, name: impl Into<String>) -> ThreadHandle {
        let frames = Arc::new(Mutex::new(Vec::new()));
        lock(&self.threads).push(RegisteredThread {
            name: name.into(),
            frames: Arc::downgrade(&frames),
        });
        ThreadHandle { frames }
    }

    /// Number of threads whose handle is still alive.
    #[must_use]
    pub fn live_threads(&self) -> usize {
        lock(&self.threads).iter().filter(|t| t.frames.strong_count() > 0).count()
    }

    /// Current stack of every live thread, innermost frame first.
    #[must_use]
    pub fn capture(&self) -> Vec<ThreadStack> {
        let mut threads = lock(&self.threads);
        threads.retain(|t| t.frames.strong_count() > 0);

        threads
            .iter()
            .filter_map(|thread| {
                let frames = thread.frames.upgrade()?;
                let frames: Vec<StackFrame> = lock(&frames).iter().rev().cloned().collect();
                Some(ThreadStack::new(thread.name.clone(), frames))
            })
            .collect()
    }
}

impl StackSnapshotProvider for ShadowStacks {
    fn snapshot(&mut self) -> Result<Vec<ThreadStack>, ProviderError> {
        Ok(self.capture())
    }
}

/// A registered thread's end of the shadow stack.
#[derive(Debug)]
pub struct ThreadHandle {
    frames: Arc<Frames>,
}

impl ThreadHandle {
    /// Push a frame; it is popped when the guard drops.
    #[must_use = "the frame is popped as soon as the guard is dropped"]
    pub fn enter(&self, namespace: impl Into<String>, name: impl Into<String>) -> FrameGuard<'_> {
        lock(&self.frames).push(StackFrame::new(namespace, name));
        FrameGuard { frames: &self.frames }
    }

    /// Current stack depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        lock(&self.frames).len()
    }
}

/// Keeps one frame on its thread's shadow stack.
#[derive(Debug)]
pub struct FrameGuard<'a> {
    frames: &'a Frames,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        lock(self.frames).pop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
