//! Forest export
//!
//! Writes a laid-out [`crate::tree::ThreadForest`] for external viewers:
//! - [`json`]: nested call trees with intervals and percentages
//! - [`folded`]: `thread;frame;frame count` lines, readable by
//!   flamegraph tooling and by [`crate::profiling::ReplayProvider`]

pub mod folded;
pub mod json;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ExportError;
use crate::tree::ThreadForest;

pub use folded::write_folded;
pub use json::write_json;

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Folded,
}

/// Write `forest` to `writer` in `format`.
///
/// # Errors
/// Returns an error if serialization or writing fails.
pub fn export<W: Write>(
    forest: &ThreadForest,
    max_scale: u64,
    format: ExportFormat,
    writer: W,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Json => write_json(forest, max_scale, writer),
        ExportFormat::Folded => write_folded(forest, writer),
    }
}

/// Create `path` and export `forest` into it.
///
/// # Errors
/// Returns [`ExportError::WriteFailed`] if the file cannot be created, or any
/// error from [`export`].
pub fn export_to_path(
    forest: &ThreadForest,
    max_scale: u64,
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let file = File::create(path)
        .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    export(forest, max_scale, format, &mut writer)?;
    writer.flush()?;
    Ok(())
}
