use std::path::PathBuf;

/// Incremental progress reported by long-running renders and assemblies.
///
/// Delivered after each discrete unit of work, on the calling thread.
#[derive(Clone, Debug, PartialEq)]
pub enum Progress {
    /// One more frame of the current scene has been composited.
    FrameComposited { done: u64, total: u64 },
    /// A scene segment file is complete.
    SegmentWritten { index: usize, path: PathBuf },
    /// One intermediate batch of the assembly is encoded (1-based `batch`).
    BatchWritten { batch: usize, total: usize },
    CartoonWritten { path: PathBuf },
}

/// Progress callback that ignores every event.
pub fn ignore_progress(_: Progress) {}
