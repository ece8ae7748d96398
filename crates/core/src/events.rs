//! Progress events emitted during a sync run
//!
//! The engine reports grouped progress through this trait; the CLI renders
//! it as log groups and progress bars. All methods default to no-ops.

/// A stage of the sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ListLocal,
    ListRemote,
    Upload,
    Delete,
}

impl Phase {
    /// Title used for the log group of this phase
    pub const fn title(self) -> &'static str {
        match self {
            Phase::ListLocal => "List local files",
            Phase::ListRemote => "List remote files",
            Phase::Upload => "Upload files",
            Phase::Delete => "Delete files",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Sink for progress of a sync run
///
/// Called concurrently from upload and delete tasks.
pub trait SyncEvents: Send + Sync {
    /// A phase begins; `total` is the number of items when known up front
    fn phase_started(&self, _phase: Phase, _total: Option<usize>) {}

    fn phase_finished(&self, _phase: Phase) {}

    /// A local file was rejected by the include/exclude filter
    fn file_skipped(&self, _key: &str) {}

    fn file_uploaded(&self, _key: &str, _bytes: u64) {}

    fn file_deleted(&self, _key: &str) {}
}

/// Event sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SyncEvents for NoopEvents {}
