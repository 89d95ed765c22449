//! Pre-flight checks for `stackscope attach`
//!
//! Validates that kernel stacks of the target can actually be read before a
//! sampling session starts, with actionable error messages.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{anyhow, bail, Result};
use std::io;
use std::path::Path;

use crate::domain::Pid;

/// Run all pre-flight checks before attaching to `pid`
pub fn run_preflight_checks(pid: Pid) -> Result<()> {
    check_privileges()?;
    check_process_exists(pid)?;
    check_stack_access(pid)?;
    Ok(())
}

/// Kernel stacks under /proc are only readable by root
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }
    bail!(
        "Permission denied: reading kernel stacks requires root privileges.\n\n\
         Run with: sudo stackscope attach ..."
    );
}

/// Check if the target process exists
pub fn check_process_exists(pid: Pid) -> Result<()> {
    let proc_path = format!("/proc/{}", pid.0);
    if !Path::new(&proc_path).exists() {
        bail!(
            "Process {} not found.\n\n\
             Is the process still running? Check with: ps -p {}",
            pid.0,
            pid.0
        );
    }
    Ok(())
}

/// Check that the main thread's kernel stack can be read
pub fn check_stack_access(pid: Pid) -> Result<()> {
    let stack_path = format!("/proc/{0}/task/{0}/stack", pid.0);
    match std::fs::read_to_string(&stack_path) {
        Ok(_) => Ok(()),
        Err(e) => Err(stack_access_error(&stack_path, pid, e)),
    }
}

/// Only an actual `EACCES`/`EPERM` is reported as a permission problem
fn stack_access_error(stack_path: &str, pid: Pid, err: io::Error) -> anyhow::Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        return anyhow!(
            "Permission denied reading {stack_path}.\n\n\
             Run with: sudo stackscope attach ..."
        );
    }
    anyhow::Error::new(err).context(format!(
        "Cannot read {stack_path}\n\n\
         This usually means:\n\
         - The process exited (check: ps -p {})\n\
         - The kernel was built without CONFIG_STACKTRACE",
        pid.0
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_not_found() {
        let result = check_process_exists(Pid(999_999_999));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_stack_access_missing_process() {
        let result = check_stack_access(Pid(999_999_999));
        assert!(result.unwrap_err().to_string().contains("Cannot read"));
    }

    #[test]
    fn test_permission_wording_only_for_permission_errors() {
        let path = "/proc/42/task/42/stack";

        let denied = stack_access_error(path, Pid(42), io::ErrorKind::PermissionDenied.into());
        assert!(format!("{denied:#}").to_lowercase().contains("permission denied"));

        for kind in [io::ErrorKind::NotFound, io::ErrorKind::InvalidInput, io::ErrorKind::Other] {
            let err = stack_access_error(path, Pid(42), kind.into());
            let msg = format!("{err:#}").to_lowercase();
            assert!(msg.contains("cannot read"), "{msg}");
            assert!(!msg.contains("permission denied"), "{msg}");
            assert!(!msg.contains("requires root"), "{msg}");
        }
    }
}
