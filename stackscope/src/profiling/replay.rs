//! Scripted stack source: replays recorded snapshots tick by tick
//!
//! Besides a plain list of snapshots, the provider reads folded stacks, the
//! text format written by [`crate::export::folded`]:
//!
//! ```text
//! # thread;outermost;...;innermost count
//! main;app::main;app::parse 3
//! main;app::main;app::run 1
//! io-worker;net::Poller::poll 2
//! ```
//!
//! Every line becomes `count` consecutive one-thread snapshots. Frame tokens
//! are split by [`StackFrame::parse`]. A line naming a thread but no frames
//! replays an empty stack. Once every snapshot has been handed out, the
//! provider keeps returning empty snapshots.

use std::collections::VecDeque;
use std::path::Path;

use super::provider::StackSnapshotProvider;
use crate::domain::{ProviderError, ReplayError};
use crate::trace_data::{StackFrame, ThreadStack};

#[derive(Debug, Clone, Default)]
pub struct ReplayProvider {
    /// Snapshot and how many more times it is handed out.
    runs: VecDeque<(Vec<ThreadStack>, u64)>,
    remaining: u64,
}

impl ReplayProvider {
    /// Replay `snapshots` in order, one per tick.
    #[must_use]
    pub fn new(snapshots: Vec<Vec<ThreadStack>>) -> Self {
        let mut replay = Self::default();
        for snapshot in snapshots {
            replay.push(snapshot, 1);
        }
        replay
    }

    /// Parse folded-stack text.
    ///
    /// # Errors
    /// Returns [`ReplayError::MalformedLine`] for a line without a numeric
    /// count or without a thread name, and [`ReplayError::Empty`] if the text
    /// holds no stack lines at all.
    pub fn from_folded(text: &str) -> Result<Self, ReplayError> {
        let mut replay = Self::default();
        let mut lines = 0usize;

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (stack, count) = parse_folded_line(line, index + 1)?;
            replay.push(vec![stack], count);
            lines += 1;
        }

        if lines == 0 {
            return Err(ReplayError::Empty);
        }
        Ok(replay)
    }

    /// Read and parse a folded-stack file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_folded(&text)
    }

    fn push(&mut self, snapshot: Vec<ThreadStack>, count: u64) {
        if count == 0 {
            return;
        }
        self.runs.push_back((snapshot, count));
        self.remaining += count;
    }

    /// Snapshots not handed out yet.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Next scripted snapshot, or an empty one once exhausted.
    pub fn next_snapshot(&mut self) -> Vec<ThreadStack> {
        let Some((snapshot, left)) = self.runs.front_mut() else {
            return Vec::new();
        };
        self.remaining -= 1;
        if *left > 1 {
            *left -= 1;
            return snapshot.clone();
        }
        self.runs.pop_front().map(|(snapshot, _)| snapshot).unwrap_or_default()
    }
}

impl StackSnapshotProvider for ReplayProvider {
    fn snapshot(&mut self) -> Result<Vec<ThreadStack>, ProviderError> {
        Ok(self.next_snapshot())
    }
}

/// Parse `thread;outer;...;inner count` into an innermost-first stack.
fn parse_folded_line(line: &str, line_no: usize) -> Result<(ThreadStack, u64), ReplayError> {
    let malformed = |reason: String| ReplayError::MalformedLine { line: line_no, reason };

    let (path, count) =
        line.rsplit_once(char::is_whitespace).ok_or_else(|| malformed("missing count".to_string()))?;
    let count: u64 =
        count.parse().map_err(|_| malformed(format!("invalid count \"{count}\"")))?;

    let mut segments = path.trim().split(';');
    let thread = segments.next().map(str::trim).unwrap_or_default();
    if thread.is_empty() {
        return Err(malformed("missing thread name".to_string()));
    }

    let mut frames: Vec<StackFrame> =
        segments.map(str::trim).filter(|s| !s.is_empty()).map(StackFrame::parse).collect();
    frames.reverse();

    Ok((ThreadStack::new(thread, frames), count))
}
