//! Kernel stack sampling of another process through `/proc`
//!
//! Linux exposes the kernel-side stack of every task at
//! `/proc/<pid>/task/<tid>/stack` (root only):
//!
//! ```text
//! [<0>] ep_poll+0x2a7/0x2e0
//! [<0>] do_epoll_wait+0xb2/0xd0
//! [<0>] nvme_poll+0x1c/0x40 [nvme]
//! [<0>] entry_SYSCALL_64_after_hwframe+0x76/0x7e
//! ```
//!
//! Lines are innermost first already. Symbols from loadable modules carry the
//! module name in brackets, which becomes the frame's namespace; everything
//! else lands in the `kernel` namespace.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use super::provider::StackSnapshotProvider;
use crate::domain::{Pid, ProviderError, Tid};
use crate::trace_data::{StackFrame, ThreadStack};

const KERNEL_NAMESPACE: &str = "kernel";

/// Samples every task of one process.
///
/// Threads are keyed `comm-tid` since thread names repeat within a process.
#[derive(Debug, Clone)]
pub struct ProcStackProvider {
    pid: Pid,
    proc_root: PathBuf,
}

impl ProcStackProvider {
    #[must_use]
    pub fn new(pid: Pid) -> Self {
        Self::with_proc_root(pid, "/proc")
    }

    /// Read from a `/proc`-shaped tree rooted somewhere else.
    pub fn with_proc_root(pid: Pid, proc_root: impl Into<PathBuf>) -> Self {
        Self { pid, proc_root: proc_root.into() }
    }

    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    fn task_dir(&self) -> PathBuf {
        self.proc_root.join(self.pid.0.to_string()).join("task")
    }

    /// List `(tid, comm)` of every task, sorted by TID.
    ///
    /// # Errors
    /// Returns [`ProviderError::ProcessGone`] if the process no longer exists.
    pub fn list_threads(&self) -> Result<Vec<(Tid, String)>, ProviderError> {
        let task_dir = self.task_dir();
        let entries = fs::read_dir(&task_dir).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProviderError::ProcessGone(self.pid),
            _ => ProviderError::Io(e),
        })?;

        let mut threads: Vec<(Tid, String)> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let tid = entry.file_name().to_string_lossy().parse::<u32>().ok()?;
                let comm = fs::read_to_string(entry.path().join("comm")).ok()?;
                Some((Tid(tid), comm.trim().to_string()))
            })
            .collect();
        threads.sort_by_key(|(tid, _)| *tid);
        Ok(threads)
    }

    fn read_task_stack(&self, tid: Tid) -> Result<Vec<StackFrame>, ProviderError> {
        let path = self.task_dir().join(tid.0.to_string()).join("stack");
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => ProviderError::Capture(format!(
                "permission denied reading {} (kernel stacks require root)",
                path.display()
            )),
            _ => ProviderError::Io(e),
        })?;
        Ok(parse_kernel_stack(&content))
    }
}

impl StackSnapshotProvider for ProcStackProvider {
    fn snapshot(&mut self) -> Result<Vec<ThreadStack>, ProviderError> {
        let mut stacks = Vec::new();
        for (tid, comm) in self.list_threads()? {
            match self.read_task_stack(tid) {
                Ok(frames) => stacks.push(ThreadStack::new(format!("{comm}-{}", tid.0), frames)),
                Err(ProviderError::Io(e)) => {
                    // The task exited between listing and reading
                    debug!("Skipping {tid}: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stacks)
    }
}

/// Parse the content of a `/proc/<pid>/task/<tid>/stack` file.
#[must_use]
pub fn parse_kernel_stack(content: &str) -> Vec<StackFrame> {
    content.lines().filter_map(parse_kernel_frame).collect()
}

/// Parse one `[<addr>] symbol+0xoff/0xlen [module]` line.
fn parse_kernel_frame(line: &str) -> Option<StackFrame> {
    let line = line.trim();
    let rest = match line.find("] ") {
        Some(pos) if line.starts_with('[') => &line[pos + 2..],
        _ => line,
    };

    let mut parts = rest.split_whitespace();
    let symbol = parts.next()?;
    let name = symbol.split_once('+').map_or(symbol, |(name, _)| name);
    if name.is_empty() {
        return None;
    }

    let namespace = parts
        .next()
        .and_then(|m| m.strip_prefix('[')?.strip_suffix(']'))
        .unwrap_or(KERNEL_NAMESPACE);
    Some(StackFrame::new(namespace, name))
}

/// True if `/proc/<pid>` exists under `proc_root`.
#[must_use]
pub fn process_exists(proc_root: &Path, pid: Pid) -> bool {
    proc_root.join(pid.0.to_string()).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_task(root: &Path, pid: u32, tid: u32, comm: &str, stack: &str) {
        let dir = root.join(pid.to_string()).join("task").join(tid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("comm"), format!("{comm}\n")).unwrap();
        fs::write(dir.join("stack"), stack).unwrap();
    }

    #[test]
    fn test_parse_kernel_frame() {
        let frame = parse_kernel_frame("[<0>] ep_poll+0x2a7/0x2e0").unwrap();
        assert_eq!(frame, StackFrame::new("kernel", "ep_poll"));

        let frame = parse_kernel_frame("[<0>] nvme_poll+0x1c/0x40 [nvme]").unwrap();
        assert_eq!(frame, StackFrame::new("nvme", "nvme_poll"));

        assert!(parse_kernel_frame("").is_none());
    }

    #[test]
    fn test_parse_kernel_stack_keeps_order() {
        let stack = "[<0>] ep_poll+0x2a7/0x2e0\n[<0>] do_epoll_wait+0xb2/0xd0\n";
        let names: Vec<_> = parse_kernel_stack(stack).into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["ep_poll", "do_epoll_wait"]);
    }

    #[test]
    fn test_snapshot_from_fake_proc() {
        let root = tempfile::tempdir().unwrap();
        fake_task(root.path(), 100, 101, "worker", "[<0>] futex_wait+0x10/0x20\n");
        fake_task(root.path(), 100, 100, "app", "[<0>] ep_poll+0x2a7/0x2e0\n");
        fake_task(root.path(), 100, 102, "idle", "");

        let mut provider = ProcStackProvider::with_proc_root(Pid(100), root.path());
        let stacks = provider.snapshot().unwrap();

        let names: Vec<_> = stacks.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["app-100", "worker-101", "idle-102"]);
        assert_eq!(stacks[1].frames, vec![StackFrame::new("kernel", "futex_wait")]);
        assert!(stacks[2].frames.is_empty());
    }

    #[test]
    fn test_missing_process() {
        let root = tempfile::tempdir().unwrap();
        let mut provider = ProcStackProvider::with_proc_root(Pid(4242), root.path());
        assert!(matches!(provider.snapshot(), Err(ProviderError::ProcessGone(Pid(4242)))));
        assert!(!process_exists(root.path(), Pid(4242)));
    }
}
