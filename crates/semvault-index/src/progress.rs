//! Build progress reporting: an output-only side channel for external UIs.

/// Phase of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Embed,
    Done,
}

/// One progress update, emitted after the scan, after each embedded batch,
/// and on completion. Never a control signal.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Chunks embedded so far.
    pub processed: usize,
    /// Total chunks scheduled for embedding this build.
    pub total: usize,
    pub phase: Phase,
    /// Usually the document currently being processed.
    pub note: Option<String>,
}

/// Callback type consumers pass to [`crate::IndexBuilder::build`].
pub type ProgressFn = dyn Fn(Progress) + Send + Sync;
