//! Per-thread call trees
//!
//! - [`node`]: the trie node and its [`MethodUsage`] payload
//! - [`forest`]: thread name → root mapping, fed one snapshot per tick
//! - [`layout`]: the allocation pass that assigns `[start, end)` intervals

pub mod forest;
pub mod layout;
pub mod node;

pub use forest::ThreadForest;
pub use layout::{allocate, allocate_with_scale, MAX_SCALE};
pub use node::{CallTreeNode, MethodUsage};
