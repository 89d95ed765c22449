//! Hot method ranking over a sampled forest.
//!
//! Aggregates every call-tree node across all threads by method identity
//! (`namespace`, `name`) to find where samples actually landed.
//!
//! - **self count**: ticks where the method was the innermost frame
//! - **total count**: ticks where the method was anywhere on the stack
//!
//! ```text
//! HOT METHODS
//! ─────────────────────────────────────────────
//!   app::Parser::next_token     42.3%   423 / 611
//!   std::io::Read::read         18.7%   187 / 187
//! ```
//!
//! A recursive method appears once per tree level, so its total count can
//! exceed the number of ticks that saw it.

// Percentage calculations intentionally convert u64 to f64
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use crate::tree::{CallTreeNode, ThreadForest};

/// A method with aggregated sample statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodHotspot {
    pub namespace: String,
    pub name: String,
    /// Ticks with this method as innermost frame.
    pub self_count: u64,
    /// Sum of node counts for this method across all trees.
    pub total_count: u64,
    /// Share of all self samples (0.0 - 100.0).
    pub percentage: f64,
}

#[derive(Default)]
struct Tally {
    self_count: u64,
    total_count: u64,
}

/// Rank methods by self count (then total count, then name).
#[must_use]
pub fn hot_methods(forest: &ThreadForest) -> Vec<MethodHotspot> {
    let mut tallies: HashMap<(&str, &str), Tally> = HashMap::new();

    for (_, root) in forest.threads() {
        let mut pending: Vec<&CallTreeNode> = root.children().iter().collect();
        while let Some(node) = pending.pop() {
            let tally = tallies
                .entry((node.usage.namespace.as_str(), node.usage.name.as_str()))
                .or_default();
            tally.self_count += node.self_count();
            tally.total_count += node.usage.invocation_count;
            pending.extend(node.children().iter());
        }
    }

    let total_self: u64 = tallies.values().map(|t| t.self_count).sum();

    let mut hotspots: Vec<MethodHotspot> = tallies
        .into_iter()
        .map(|((namespace, name), tally)| MethodHotspot {
            namespace: namespace.to_string(),
            name: name.to_string(),
            self_count: tally.self_count,
            total_count: tally.total_count,
            percentage: if total_self > 0 {
                tally.self_count as f64 / total_self as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    hotspots.sort_by(|a, b| {
        b.self_count
            .cmp(&a.self_count)
            .then_with(|| b.total_count.cmp(&a.total_count))
            .then_with(|| a.namespace.cmp(&b.namespace))
            .then_with(|| a.name.cmp(&b.name))
    });
    hotspots
}

/// The `n` hottest methods.
#[must_use]
pub fn top_n(forest: &ThreadForest, n: usize) -> Vec<MethodHotspot> {
    let mut hotspots = hot_methods(forest);
    hotspots.truncate(n);
    hotspots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_data::{StackFrame, ThreadStack};

    fn stack(thread: &str, frames: &[&str]) -> ThreadStack {
        ThreadStack::new(thread, frames.iter().map(|f| StackFrame::parse(f)).collect())
    }

    #[test]
    fn test_empty_forest() {
        assert!(hot_methods(&ThreadForest::new()).is_empty());
    }

    #[test]
    fn test_ranks_by_self_count_across_threads() {
        let mut forest = ThreadForest::new();
        // leaf "io::read" under main twice, under worker once; "app::main" never a leaf
        forest.record(&[stack("main", &["io::read", "app::main"])]);
        forest.record(&[stack("main", &["io::read", "app::main"])]);
        forest.record(&[stack("worker", &["io::read", "app::job"])]);
        forest.record(&[stack("worker", &["app::job"])]);

        let hot = hot_methods(&forest);
        assert_eq!(hot[0].name, "read");
        assert_eq!(hot[0].self_count, 3);
        assert_eq!(hot[0].total_count, 3);
        assert!((hot[0].percentage - 75.0).abs() < 1e-9);

        assert_eq!(hot[1].name, "job");
        assert_eq!((hot[1].self_count, hot[1].total_count), (1, 2));

        let main = hot.iter().find(|h| h.name == "main").unwrap();
        assert_eq!((main.self_count, main.total_count), (0, 2));
    }

    #[test]
    fn test_top_n_truncates() {
        let mut forest = ThreadForest::new();
        forest.record(&[stack("t", &["a::x"]), stack("u", &["b::y"]), stack("v", &["c::z"])]);
        assert_eq!(top_n(&forest, 2).len(), 2);
    }
}
