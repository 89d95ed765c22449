//! # stackscope - Sampling Call-Tree Aggregator
//!
//! stackscope periodically captures the call stacks of every live thread,
//! merges each stack into a per-thread call tree, and once sampling stops
//! lays the trees out as flame-graph intervals for an external viewer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Stack sources (providers)                   │
//! │  • ShadowStacks: instrumented threads push/pop frames           │
//! │  • ReplayProvider: recorded folded stacks                       │
//! │  • ProcStackProvider: /proc/<pid>/task/<tid>/stack (Linux)      │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ snapshot() once per tick
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Sampler (background thread)                    │
//! │   tick → ThreadForest::record → per-thread call trees           │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ stop(): join, then allocate
//!                         ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Layout     │──▶│   Analysis   │   │    Export    │
//! │ [start, end) │   │ (hot methods)│   │ JSON/folded  │
//! └──────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`tree`]: call-tree nodes, the thread forest and the interval allocator
//! - [`profiling`]: the sampler engine and the stack providers
//! - [`analysis`]: hot method ranking over a finished forest
//! - [`export`]: JSON and folded-stack writers
//! - [`trace_data`]: frames and thread stacks shared by providers and trees
//! - [`domain`]: newtypes (`Pid`, `Tid`) and error enums
//! - [`cli`], [`preflight`], [`process_lookup`], [`workload`]: binary support
//!
//! ## Typical Usage
//!
//! ```no_run
//! use stackscope::profiling::{Sampler, ShadowStacks};
//!
//! let stacks = ShadowStacks::new();
//! let mut sampler = Sampler::new(stacks.clone());
//! sampler.start()?;
//! {
//!     let thread = stacks.register("main");
//!     let _frame = thread.enter("app", "work");
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! sampler.stop()?;
//! let forest = sampler.snapshot();
//! # Ok::<(), stackscope::domain::SamplerError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod preflight;
pub mod process_lookup;
pub mod profiling;
pub mod trace_data;
pub mod tree;
pub mod workload;
