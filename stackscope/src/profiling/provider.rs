//! Stack snapshot capability injected into the sampler

use crate::domain::ProviderError;
use crate::trace_data::ThreadStack;

/// Source of thread stacks for the sampler.
///
/// Each call returns the current stack of every live thread, frames
/// innermost first. The sampler owns the provider on its background thread,
/// hence `Send`.
pub trait StackSnapshotProvider: Send {
    /// Capture all live threads once.
    ///
    /// # Errors
    /// Returns an error if the stacks cannot be captured; the sampler skips
    /// the tick and keeps going.
    fn snapshot(&mut self) -> Result<Vec<ThreadStack>, ProviderError>;
}

impl<F> StackSnapshotProvider for F
where
    F: FnMut() -> Result<Vec<ThreadStack>, ProviderError> + Send,
{
    fn snapshot(&mut self) -> Result<Vec<ThreadStack>, ProviderError> {
        self()
    }
}
