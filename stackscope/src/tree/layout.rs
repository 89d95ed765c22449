//! Interval allocation: turn invocation counts into flame-graph coordinates
//!
//! After sampling, every node of a thread's tree gets a half-open interval
//! `[start, end)` on a fixed integer axis `0..max_scale`. A child's width is
//! its share of the parent's width, proportional to its invocation count
//! among its siblings:
//!
//! ```text
//! root   [0 ─────────────────────────────── 10000)
//! main   [0 ─────────────────────────────── 10000)
//! parse  [0 ──────── 5000) run [5000 ────── 10000)
//! ```
//!
//! Widths are truncated, and the remainder is never redistributed: the
//! rounding error stays with whichever child comes last in list order.

// Percentages are derived from integer widths
#![allow(clippy::cast_precision_loss)]

use super::node::CallTreeNode;

/// Width of a root interval: 100.00% with two implied decimal digits.
pub const MAX_SCALE: u64 = 10_000;

/// Lay out `root` on the default `0..MAX_SCALE` axis.
pub fn allocate(root: &mut CallTreeNode) {
    allocate_with_scale(root, MAX_SCALE);
}

/// Lay out `root` on a `0..max_scale` axis.
///
/// The root's own invocation count is replaced by the sum of its
/// descendants' counts (the sampler never credits the root directly).
/// Children whose siblings were never visited (sibling total 0) get a
/// zero-width interval `[base, base)` and percentage 0.
///
/// Running this twice on the same tree produces identical values.
pub fn allocate_with_scale(root: &mut CallTreeNode, max_scale: u64) {
    root.start = 0;
    root.end = max_scale;
    root.usage.invocation_count = root.sum_descendant_invocations();
    root.usage.percentage = share(root.start, root.end, max_scale);

    let mut pending: Vec<&mut CallTreeNode> = vec![root];
    while let Some(node) = pending.pop() {
        distribute(node, max_scale);
        pending.extend(node.children_mut().iter_mut());
    }
}

/// Split `parent`'s interval among its children, in child-list order.
fn distribute(parent: &mut CallTreeNode, max_scale: u64) {
    let width = parent.end - parent.start;
    let sibling_total: u128 =
        parent.children().iter().map(|c| u128::from(c.usage.invocation_count)).sum();
    let mut base = parent.start;

    for child in parent.children_mut() {
        child.start = base;
        child.end = base + proportional_width(width, child.usage.invocation_count, sibling_total);
        child.usage.percentage = share(child.start, child.end, max_scale);
        base = child.end;
    }
}

/// `floor(width * count / total)`, 0 when `total` is 0.
fn proportional_width(width: u64, count: u64, total: u128) -> u64 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(width) * u128::from(count) / total;
    // count <= total for any sibling, so the result never exceeds width
    u64::try_from(scaled).unwrap_or(width)
}

fn share(start: u64, end: u64, max_scale: u64) -> f64 {
    if max_scale == 0 {
        return 0.0;
    }
    (end - start) as f64 / max_scale as f64
}
