//! Active-run registry keyed by thread.

use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use super::run::Run;

/// Map from thread to that thread's active run.
///
/// Each thread sees only its own slot, so concurrent threads can each have
/// a `RUNNING` run without interfering. Clones share the same slots.
///
/// Slots are not tied to thread lifetime: a thread that exits while its run
/// is still active leaves the entry (and the `Arc<Run>`) in the map. Worker
/// threads should end their run, or call [`ActiveRuns::take_current`],
/// before returning.
///
/// ```rust
/// use trueno_track::experiment::ActiveRuns;
///
/// let registry = ActiveRuns::new();
/// assert!(registry.current().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActiveRuns {
    slots: Arc<DashMap<ThreadId, Arc<Run>>>,
}

impl ActiveRuns {
    /// Create an empty, independent registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry shared by trackers that do not inject one.
    #[must_use]
    pub fn process() -> Self {
        static PROCESS: OnceLock<ActiveRuns> = OnceLock::new();
        PROCESS.get_or_init(Self::new).clone()
    }

    /// Get the current thread's active run.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Run>> {
        self.slots
            .get(&thread::current().id())
            .map(|slot| Arc::clone(slot.value()))
    }

    /// Publish `run` as the current thread's active run, returning any run
    /// it replaces.
    pub fn set_current(&self, run: Arc<Run>) -> Option<Arc<Run>> {
        self.slots.insert(thread::current().id(), run)
    }

    /// Clear the current thread's slot, returning the run it held.
    pub fn take_current(&self) -> Option<Arc<Run>> {
        self.slots
            .remove(&thread::current().id())
            .map(|(_, run)| run)
    }

    /// Number of threads with an active run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no thread has an active run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
