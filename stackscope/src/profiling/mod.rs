//! Profiling core modules
//!
//! - [`sampler`]: the background sampling loop and its session lifecycle
//! - [`provider`]: the stack capture capability the sampler is built on
//! - [`shadow_stack`]: in-process instrumentation provider
//! - [`replay`]: scripted / folded-stack provider
//! - [`proc_stacks`]: Linux `/proc` kernel-stack provider

pub mod proc_stacks;
pub mod provider;
pub mod replay;
pub mod sampler;
pub mod shadow_stack;

// Re-export common types
pub use proc_stacks::ProcStackProvider;
pub use provider::StackSnapshotProvider;
pub use replay::ReplayProvider;
pub use sampler::{Sampler, SamplerConfig, SamplerStats, DEFAULT_INTERVAL};
pub use shadow_stack::{FrameGuard, ShadowStacks, ThreadHandle};
