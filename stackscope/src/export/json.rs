//! JSON export of laid-out call trees
//!
//! ```json
//! {
//!   "maxScale": 10000,
//!   "threads": [
//!     { "name": "main",
//!       "root": { "namespace": "", "name": "", "invocationCount": 3,
//!                 "percentage": 1.0, "start": 0, "end": 10000, "depth": 0,
//!                 "children": [ ... ] } }
//!   ]
//! }
//! ```

use serde::Serialize;
use std::io::Write;

use crate::domain::ExportError;
use crate::tree::{CallTreeNode, ThreadForest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedForest<'a> {
    max_scale: u64,
    threads: Vec<ExportedThread<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportedThread<'a> {
    name: &'a str,
    root: ExportedNode<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedNode<'a> {
    namespace: &'a str,
    name: &'a str,
    invocation_count: u64,
    percentage: f64,
    start: u64,
    end: u64,
    depth: u32,
    children: Vec<ExportedNode<'a>>,
}

impl<'a> ExportedNode<'a> {
    fn from_node(node: &'a CallTreeNode) -> Self {
        Self {
            namespace: &node.usage.namespace,
            name: &node.usage.name,
            invocation_count: node.usage.invocation_count,
            percentage: node.usage.percentage,
            start: node.start,
            end: node.end,
            depth: node.depth,
            children: node.children().iter().map(ExportedNode::from_node).collect(),
        }
    }
}

/// Serialize `forest` as pretty-printed JSON.
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(
    forest: &ThreadForest,
    max_scale: u64,
    writer: W,
) -> Result<(), ExportError> {
    let exported = ExportedForest {
        max_scale,
        threads: forest
            .threads()
            .map(|(name, root)| ExportedThread { name, root: ExportedNode::from_node(root) })
            .collect(),
    };
    serde_json::to_writer_pretty(writer, &exported)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_data::{StackFrame, ThreadStack};
    use crate::tree::MAX_SCALE;

    #[test]
    fn test_json_shape() {
        let mut forest = ThreadForest::new();
        forest.record(&[ThreadStack::new("main", vec![StackFrame::new("app", "run")])]);
        forest.allocate(MAX_SCALE);

        let mut buffer = Vec::new();
        write_json(&forest, MAX_SCALE, &mut buffer).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(parsed["maxScale"], 10_000);
        let thread = &parsed["threads"][0];
        assert_eq!(thread["name"], "main");
        assert_eq!(thread["root"]["end"], 10_000);
        let run = &thread["root"]["children"][0];
        assert_eq!(run["namespace"], "app");
        assert_eq!(run["name"], "run");
        assert_eq!(run["invocationCount"], 1);
        assert_eq!(run["depth"], 1);
        assert_eq!(run["percentage"], 1.0);
    }
}
