//! Structured error types for stackscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Sampler is already running")]
    AlreadyRunning,

    #[error("Sampler is not running")]
    NotRunning,

    #[error("Stack provider was lost when the sampling thread failed to start")]
    ProviderLost,

    #[error("Failed to spawn sampling thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Sampling thread panicked")]
    LoopPanicked,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Process {0} not found")]
    ProcessGone(Pid),

    #[error("Stack capture failed: {0}")]
    Capture(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("No stack lines found")]
    Empty,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    WriteFailed(String),

    #[error("Name \"{0}\" cannot be written as a folded-stack segment")]
    Unrepresentable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
