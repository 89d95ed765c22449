//! Resolve a process name to a PID for `stackscope attach <PROCESS>`.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::domain::Pid;

/// A process found by name.
#[derive(Debug)]
pub struct ProcessMatch {
    pub pid: Pid,
    pub command: String,
}

/// Find the single process whose command name or executable matches `name`.
///
/// Exact matches on `/proc/<pid>/comm` or the basename of argv\[0\] win over
/// substring matches.
///
/// # Errors
/// - No process matches
/// - Several processes match equally well (ambiguous)
pub fn find_process_by_name(name: &str) -> Result<ProcessMatch> {
    let own_pid = std::process::id();
    let mut exact = Vec::new();
    let mut partial = Vec::new();

    for entry in fs::read_dir("/proc").context("Failed to read /proc")?.flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        if pid == own_pid {
            continue;
        }
        let Some((command, argv0)) = read_identity(&entry.path()) else {
            continue;
        };

        let candidate = ProcessMatch { pid: Pid(pid), command };
        if candidate.command == name || argv0 == name {
            exact.push(candidate);
        } else if candidate.command.contains(name) || argv0.contains(name) {
            partial.push(candidate);
        }
    }

    let mut matches = if exact.is_empty() { partial } else { exact };
    match matches.len() {
        0 => bail!(
            "No process matching '{name}' found.\n\
             Check running processes with: ps aux | grep {name}"
        ),
        1 => Ok(matches.remove(0)),
        _ => {
            let list: Vec<String> =
                matches.iter().map(|m| format!("  {} ({})", m.pid.0, m.command)).collect();
            bail!(
                "Multiple processes match '{name}':\n{}\n\n\
                 Specify PID explicitly: stackscope attach --pid <PID>",
                list.join("\n")
            )
        }
    }
}

/// `(comm, basename of argv[0])` of a `/proc/<pid>` directory.
fn read_identity(proc_dir: &Path) -> Option<(String, String)> {
    let comm = fs::read_to_string(proc_dir.join("comm")).ok()?;
    let cmdline = fs::read(proc_dir.join("cmdline")).ok()?;
    Some((comm.trim().to_string(), argv0_basename(&cmdline)))
}

/// Basename of the first NUL-separated argument of a cmdline blob.
fn argv0_basename(cmdline: &[u8]) -> String {
    let argv0 = cmdline.split(|b| *b == 0).next().unwrap_or_default();
    let argv0 = String::from_utf8_lossy(argv0);
    Path::new(argv0.as_ref())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
