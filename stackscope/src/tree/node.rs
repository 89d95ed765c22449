//! Call-tree node and its per-method payload

use crate::trace_data::StackFrame;

/// Per-node payload: which method the node stands for and how often it was
/// seen on a sampled stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodUsage {
    /// Declaring type / module of the method.
    pub namespace: String,
    /// Method name.
    pub name: String,
    /// Number of ticks this node was on the captured path.
    pub invocation_count: u64,
    /// Share of the whole tree's span, in `[0, 1]`. Only set by the
    /// allocation pass.
    pub percentage: f64,
}

impl MethodUsage {
    /// Usage record for a newly discovered frame (count 0).
    #[must_use]
    pub fn for_frame(frame: &StackFrame) -> Self {
        Self {
            namespace: frame.namespace.clone(),
            name: frame.name.clone(),
            invocation_count: 0,
            percentage: 0.0,
        }
    }

    /// Same-node rule: namespace and name must both match exactly.
    /// Overloads of one method therefore share a node.
    #[must_use]
    pub fn is_frame(&self, frame: &StackFrame) -> bool {
        self.name == frame.name && self.namespace == frame.namespace
    }
}

/// A node of a per-thread call tree.
///
/// Children keep discovery order. `start`/`end` form a half-open interval on
/// the `0..max_scale` axis once [`crate::tree::layout::allocate`] has run;
/// before that both are 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallTreeNode {
    children: Vec<CallTreeNode>,
    pub start: u64,
    pub end: u64,
    pub depth: u32,
    pub usage: MethodUsage,
}

impl CallTreeNode {
    /// Root of a thread's tree: depth 0, empty payload.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    fn new(usage: MethodUsage, depth: u32) -> Self {
        Self { children: Vec::new(), start: 0, end: 0, depth, usage }
    }

    #[must_use]
    pub fn children(&self) -> &[CallTreeNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [CallTreeNode] {
        &mut self.children
    }

    /// Child matching `frame`, if one was discovered already.
    #[must_use]
    pub fn child(&self, frame: &StackFrame) -> Option<&CallTreeNode> {
        self.children.iter().find(|c| c.usage.is_frame(frame))
    }

    /// Return the child for `frame`, appending a fresh one at `depth` if it
    /// does not exist yet.
    pub fn ensure_child(&mut self, frame: &StackFrame, depth: u32) -> &mut CallTreeNode {
        let index = match self.children.iter().position(|c| c.usage.is_frame(frame)) {
            Some(index) => index,
            None => {
                self.children.push(CallTreeNode::new(MethodUsage::for_frame(frame), depth));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Merge one captured stack (innermost first) below this node and credit
    /// one visit to every node on its path, leaf included.
    ///
    /// The stack is walked outermost first. A node created for the frame at
    /// index `i` gets depth `frames.len() - i`.
    pub fn merge_stack(&mut self, frames: &[StackFrame]) {
        let total = frames.len();
        let mut node = self;
        for (remaining, frame) in frames.iter().enumerate().rev() {
            #[allow(clippy::cast_possible_truncation)]
            let depth = (total - remaining) as u32;
            node = node.ensure_child(frame, depth);
            node.usage.invocation_count += 1;
        }
    }

    /// Sum of `invocation_count` over every strict descendant.
    ///
    /// Iterative so very deep trees cannot overflow the call stack.
    #[must_use]
    pub fn sum_descendant_invocations(&self) -> u64 {
        let mut total = 0u64;
        let mut pending: Vec<&CallTreeNode> = self.children.iter().collect();
        while let Some(node) = pending.pop() {
            total += node.usage.invocation_count;
            pending.extend(node.children.iter());
        }
        total
    }

    /// Visits where this node was the innermost frame.
    #[must_use]
    pub fn self_count(&self) -> u64 {
        let children: u64 = self.children.iter().map(|c| c.usage.invocation_count).sum();
        self.usage.invocation_count.saturating_sub(children)
    }

    /// Number of nodes in this subtree, this node included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CallTreeNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(names: &[&str]) -> Vec<StackFrame> {
        names.iter().map(|n| StackFrame::parse(n)).collect()
    }

    #[test]
    fn test_merge_creates_path_outermost_first() {
        let mut root = CallTreeNode::root();
        // innermost first: inner() was called by outer()
        root.merge_stack(&stack(&["app::inner", "app::outer"]));

        assert_eq!(root.children().len(), 1);
        let outer = &root.children()[0];
        assert_eq!(outer.usage.name, "outer");
        assert_eq!(outer.depth, 1);
        let inner = &outer.children()[0];
        assert_eq!(inner.usage.name, "inner");
        assert_eq!(inner.depth, 2);
        assert_eq!(inner.usage.invocation_count, 1);
        assert_eq!(root.usage.invocation_count, 0);
    }

    #[test]
    fn test_shared_prefix_reuses_nodes() {
        let mut root = CallTreeNode::root();
        root.merge_stack(&stack(&["app::a", "app::main"]));
        root.merge_stack(&stack(&["app::b", "app::main"]));

        assert_eq!(root.children().len(), 1);
        let main = &root.children()[0];
        assert_eq!(main.usage.invocation_count, 2);
        let names: Vec<_> = main.children().iter().map(|c| c.usage.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_overloads_alias_into_one_node() {
        let mut root = CallTreeNode::root();
        root.merge_stack(&[StackFrame::new("Util", "format")]);
        root.merge_stack(&[StackFrame::new("Util", "format")]);
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.children()[0].usage.invocation_count, 2);
    }

    #[test]
    fn test_same_name_different_namespace_is_distinct() {
        let mut root = CallTreeNode::root();
        root.merge_stack(&[StackFrame::new("A", "run")]);
        root.merge_stack(&[StackFrame::new("B", "run")]);
        assert_eq!(root.children().len(), 2);
    }

    #[test]
    fn test_sum_descendants_excludes_self() {
        let mut root = CallTreeNode::root();
        root.merge_stack(&stack(&["x::c", "x::b", "x::a"]));
        root.merge_stack(&stack(&["x::a"]));
        root.usage.invocation_count = 100;
        // a=2, b=1, c=1
        assert_eq!(root.sum_descendant_invocations(), 4);
        assert_eq!(root.children()[0].sum_descendant_invocations(), 2);
    }

    #[test]
    fn test_self_count_and_node_count() {
        let mut root = CallTreeNode::root();
        root.merge_stack(&stack(&["x::b", "x::a"]));
        root.merge_stack(&stack(&["x::a"]));
        let a = &root.children()[0];
        assert_eq!(a.self_count(), 1);
        assert_eq!(a.children()[0].self_count(), 1);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn test_deep_stack_sum_is_iterative() {
        let frames: Vec<StackFrame> =
            (0..2_000).map(|i| StackFrame::new("deep", format!("f{i}"))).collect();
        let mut root = CallTreeNode::root();
        root.merge_stack(&frames);
        assert_eq!(root.sum_descendant_invocations(), 2_000);
    }
}
