//! Folded-stack export
//!
//! One line per call path that was the innermost frame at least once:
//! `thread;outer;...;inner self_count`. Replaying the output through
//! [`crate::profiling::ReplayProvider`] rebuilds the same trees.
//!
//! Frames are written so that [`StackFrame::parse`] reads them back as the
//! same frame: `namespace::name`, or a bare `name` when there is no
//! namespace. A namespace-less name containing `.` is written `::a.b` so it
//! is not split on replay. Names that cannot survive the line format (a `;`,
//! surrounding whitespace, a thread starting with `#`) fail the export
//! before anything is written.

use std::io::Write;

use crate::domain::ExportError;
use crate::trace_data::StackFrame;
use crate::tree::{CallTreeNode, ThreadForest};

/// Write every thread's non-zero self counts as folded lines.
///
/// # Errors
/// Returns [`ExportError::Unrepresentable`] for a thread or frame name the
/// folded format cannot carry, or an error if writing fails.
pub fn write_folded<W: Write>(forest: &ThreadForest, mut writer: W) -> Result<(), ExportError> {
    let mut lines = Vec::new();

    for (thread, root) in forest.threads() {
        check_segment(thread)?;
        if thread.starts_with('#') {
            return Err(ExportError::Unrepresentable(thread.to_string()));
        }

        // (node, path prefix leading to it)
        let mut pending: Vec<(&CallTreeNode, String)> = root
            .children()
            .iter()
            .rev()
            .map(|child| (child, thread.to_string()))
            .collect();

        while let Some((node, prefix)) = pending.pop() {
            let path = format!("{prefix};{}", frame_token(node)?);
            let self_count = node.self_count();
            if self_count > 0 {
                lines.push(format!("{path} {self_count}"));
            }
            pending.extend(node.children().iter().rev().map(|child| (child, path.clone())));
        }
    }

    for line in lines {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

fn frame_token(node: &CallTreeNode) -> Result<String, ExportError> {
    let usage = &node.usage;
    let token = if usage.namespace.is_empty() && !usage.name.contains('.') {
        usage.name.clone()
    } else if usage.namespace.is_empty() {
        format!("::{}", usage.name)
    } else {
        format!("{}::{}", usage.namespace, usage.name)
    };

    check_segment(&token)?;
    let parsed = StackFrame::parse(&token);
    if parsed.namespace != usage.namespace || parsed.name != usage.name {
        return Err(ExportError::Unrepresentable(token));
    }
    Ok(token)
}

/// A `;`-separated segment must survive splitting and trimming on replay.
fn check_segment(segment: &str) -> Result<(), ExportError> {
    if segment.is_empty() || segment.contains(';') || segment.trim() != segment {
        return Err(ExportError::Unrepresentable(segment.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace_data::{StackFrame, ThreadStack};

    #[test]
    fn test_folded_lines_in_tree_order() {
        let mut forest = ThreadForest::new();
        let main = |frames: &[&str]| {
            ThreadStack::new("main", frames.iter().map(|f| StackFrame::parse(f)).collect())
        };
        forest.record(&[main(&["app::parse", "app::main"])]);
        forest.record(&[main(&["app::parse", "app::main"])]);
        forest.record(&[main(&["app::main"])]);
        forest.record(&[main(&["app::run", "app::main"])]);

        let mut buffer = Vec::new();
        write_folded(&forest, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "main;app::main 1\nmain;app::main;app::parse 2\nmain;app::main;app::run 1\n"
        );
    }

    fn folded(frames: Vec<StackFrame>) -> Result<String, ExportError> {
        let mut forest = ThreadForest::new();
        forest.record(&[ThreadStack::new("main", frames)]);
        let mut buffer = Vec::new();
        write_folded(&forest, &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap())
    }

    #[test]
    fn test_dotted_name_without_namespace_keeps_identity() {
        let text = folded(vec![StackFrame::new("", "a.b")]).unwrap();
        assert_eq!(text, "main;::a.b 1\n");
        assert_eq!(StackFrame::parse("::a.b"), StackFrame::new("", "a.b"));

        let text = folded(vec![StackFrame::new("", "tick")]).unwrap();
        assert_eq!(text, "main;tick 1\n");
    }

    #[test]
    fn test_unrepresentable_frames_are_rejected() {
        for frame in [
            StackFrame::new("app", "a;b"),
            StackFrame::new("app", "run "),
            StackFrame::new("app", "to::string"),
            StackFrame::new("", ""),
        ] {
            assert!(
                matches!(folded(vec![frame.clone()]), Err(ExportError::Unrepresentable(_))),
                "{frame:?}"
            );
        }
    }

    #[test]
    fn test_nothing_written_on_rejection() {
        let mut forest = ThreadForest::new();
        forest.record(&[ThreadStack::new("a", vec![StackFrame::new("app", "ok")])]);
        forest.record(&[ThreadStack::new("b", vec![StackFrame::new("app", "x;y")])]);

        let mut buffer = Vec::new();
        assert!(write_folded(&forest, &mut buffer).is_err());
        assert!(buffer.is_empty());
    }
}
