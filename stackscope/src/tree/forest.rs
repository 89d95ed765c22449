//! Thread forest: one call tree per observed thread

use std::collections::BTreeMap;

use super::layout::allocate_with_scale;
use super::node::CallTreeNode;
use crate::trace_data::ThreadStack;

/// Mapping from thread name to that thread's call-tree root.
///
/// A root is created the first time a thread reports a non-empty stack and
/// is kept for the rest of the session, even after the thread is gone.
/// Threads are iterated in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadForest {
    roots: BTreeMap<String, CallTreeNode>,
}

impl ThreadForest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one snapshot (every live thread's stack) into the forest.
    ///
    /// Threads whose stack is empty are skipped and do not get a root.
    pub fn record(&mut self, stacks: &[ThreadStack]) {
        for stack in stacks {
            if stack.frames.is_empty() {
                continue;
            }
            self.roots
                .entry(stack.name.clone())
                .or_insert_with(CallTreeNode::root)
                .merge_stack(&stack.frames);
        }
    }

    /// Run the allocation pass over every tree.
    pub fn allocate(&mut self, max_scale: u64) {
        for root in self.roots.values_mut() {
            allocate_with_scale(root, max_scale);
        }
    }

    #[must_use]
    pub fn get(&self, thread: &str) -> Option<&CallTreeNode> {
        self.roots.get(thread)
    }

    pub fn threads(&self) -> impl Iterator<Item = (&str, &CallTreeNode)> {
        self.roots.iter().map(|(name, root)| (name.as_str(), root))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
