use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use crate::export::coordinator::Shared;
use crate::foundation::error::{ErrorKind, FramecutError, FramecutResult};

/// How long an interactive caller waits before giving up on an export.
pub const INTERACTIVE_EXPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// The single terminal outcome of one export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportResult {
    /// The output file is complete.
    Completed {
        /// Final output path.
        output: PathBuf,
    },
    /// The render or encode failed after the worker started.
    Failed {
        /// Error classification.
        kind: ErrorKind,
        /// Diagnostic text, including encoder stderr when available.
        message: String,
    },
    /// The export was cancelled; no output file was left behind.
    Cancelled,
}

impl ExportResult {
    /// Return `true` for [`ExportResult::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Output path of a completed export.
    pub fn output(&self) -> Option<&PathBuf> {
        match self {
            Self::Completed { output } => Some(output),
            _ => None,
        }
    }

    pub(crate) fn from_error(err: &FramecutError) -> Self {
        match err {
            FramecutError::Cancelled => Self::Cancelled,
            other => Self::Failed {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

/// Per-export rendezvous between the worker and any number of waiters.
#[derive(Debug, Default)]
pub(crate) struct JobSlot {
    result: Mutex<Option<ExportResult>>,
    done: Condvar,
    pub(crate) cancel: AtomicBool,
}

impl JobSlot {
    pub(crate) fn publish(&self, result: ExportResult) {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(result);
        }
        self.done.notify_all();
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn peek(&self) -> Option<ExportResult> {
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn wait(&self) -> ExportResult {
        let mut slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self.done.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait_for(&self, timeout: Duration) -> Option<ExportResult> {
        let slot = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        let (slot, _) = self
            .done
            .wait_timeout_while(slot, timeout, |r| r.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.clone()
    }
}

/// Handle to one running export.
///
/// Cloning is cheap; every clone observes the same terminal result.
#[derive(Clone, Debug)]
pub struct ExportTask {
    pub(crate) slot: Arc<JobSlot>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) output: PathBuf,
}

impl ExportTask {
    /// Path the export writes to on success.
    pub fn output_path(&self) -> &PathBuf {
        &self.output
    }

    /// Block until the export reaches its terminal state.
    pub fn wait(&self) -> ExportResult {
        self.slot.wait()
    }

    /// Wait at most `timeout`. On expiry the export is cancelled, its terminal state awaited, and
    /// [`FramecutError::Timeout`] returned.
    pub fn wait_timeout(&self, timeout: Duration) -> FramecutResult<ExportResult> {
        if let Some(result) = self.slot.wait_for(timeout) {
            return Ok(result);
        }
        tracing::warn!(?timeout, output = %self.output.display(), "export timed out; cancelling");
        self.cancel();
        let _ = self.slot.wait();
        Err(FramecutError::Timeout(timeout))
    }

    /// Terminal result, if already reached.
    pub fn try_result(&self) -> Option<ExportResult> {
        self.slot.peek()
    }

    /// Request cooperative cancellation. Has no effect once the export is terminal.
    pub fn cancel(&self) -> bool {
        self.shared.cancel_job(&self.slot)
    }

    /// Return `true` once a terminal result exists.
    pub fn is_finished(&self) -> bool {
        self.slot.peek().is_some()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/task.rs"]
mod tests;
