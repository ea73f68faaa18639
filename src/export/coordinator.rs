use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::assets::decoder::{FfmpegDecoder, MediaDecoder};
use crate::encode::ffmpeg::FfmpegSinkFactory;
use crate::encode::sink::SinkFactory;
use crate::export::naming::{OutputKind, output_path};
use crate::export::pipeline::{self, ExportOpts, ExportStats};
use crate::export::task::{ExportResult, ExportTask, JobSlot};
use crate::foundation::error::{FramecutError, FramecutResult};
use crate::plan::CompositionPlan;

/// Lifecycle of a coordinator. Any terminal state may start a new export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExportState {
    /// Nothing exported yet.
    #[default]
    Idle,
    /// A worker is rendering.
    Exporting,
    /// The last export completed.
    Completed,
    /// The last export failed.
    Failed,
    /// The last export was cancelled.
    Cancelled,
}

#[derive(Debug, Default)]
struct Inner {
    state: ExportState,
    job: Option<Arc<JobSlot>>,
}

/// State shared between a coordinator, its tasks and its worker.
///
/// Lock order is `inner` before a job's result slot.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(inner: &Inner, slot: &Arc<JobSlot>) -> bool {
        inner
            .job
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    pub(crate) fn cancel_job(&self, slot: &Arc<JobSlot>) -> bool {
        let inner = self.lock();
        if inner.state != ExportState::Exporting || !Self::is_current(&inner, slot) {
            return false;
        }
        slot.cancel.store(true, Ordering::Release);
        tracing::info!("export cancellation requested");
        true
    }

    fn cancel_current(&self) -> bool {
        let inner = self.lock();
        match (&inner.job, inner.state) {
            (Some(slot), ExportState::Exporting) => {
                slot.cancel.store(true, Ordering::Release);
                tracing::info!("export cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Undo a reservation whose job never started.
    fn release(&self, slot: &Arc<JobSlot>, previous: ExportState) {
        let mut inner = self.lock();
        if Self::is_current(&inner, slot) {
            inner.state = previous;
            inner.job = None;
        }
    }

    /// Decide the terminal result under the state lock, then publish it to waiters.
    fn finish(
        &self,
        slot: &Arc<JobSlot>,
        outcome: &FramecutResult<ExportStats>,
        output: &Path,
    ) -> ExportResult {
        let mut inner = self.lock();
        let result = if slot.is_cancel_requested() {
            if outcome.is_ok() {
                // finished before the flag was seen; cancellation still wins
                let _ = std::fs::remove_file(output);
            }
            ExportResult::Cancelled
        } else {
            match outcome {
                Ok(_) => ExportResult::Completed {
                    output: output.to_path_buf(),
                },
                Err(e) => ExportResult::from_error(e),
            }
        };
        inner.state = match &result {
            ExportResult::Completed { .. } => ExportState::Completed,
            ExportResult::Failed { .. } => ExportState::Failed,
            ExportResult::Cancelled => ExportState::Cancelled,
        };
        if Self::is_current(&inner, slot) {
            inner.job = None;
        }
        slot.publish(result.clone());
        result
    }
}

type FinishCallback = Box<dyn FnOnce(&ExportResult) + Send + 'static>;

/// Drives one export at a time from a [`CompositionPlan`] to an encoded file.
///
/// `export` validates and composes on the caller's thread, so construction errors come back
/// synchronously. Rendering happens on a named worker thread that produces exactly one
/// [`ExportResult`].
pub struct ExportCoordinator {
    decoder: Arc<dyn MediaDecoder>,
    sinks: Arc<dyn SinkFactory>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl Default for ExportCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExportCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportCoordinator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ExportCoordinator {
    /// Coordinator decoding and encoding through the system `ffmpeg`.
    pub fn new() -> Self {
        Self::with_backends(Arc::new(FfmpegDecoder), Arc::new(FfmpegSinkFactory))
    }

    /// Coordinator with custom decode and encode backends.
    pub fn with_backends(decoder: Arc<dyn MediaDecoder>, sinks: Arc<dyn SinkFactory>) -> Self {
        Self {
            decoder,
            sinks,
            shared: Arc::new(Shared::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExportState {
        self.shared.lock().state
    }

    /// Return `true` while a worker is rendering.
    pub fn is_exporting(&self) -> bool {
        self.state() == ExportState::Exporting
    }

    /// Start exporting `plan` to `output`.
    ///
    /// Fails with [`FramecutError::AlreadyExporting`] while another export runs; the running one
    /// is left untouched.
    pub fn export(
        &self,
        plan: &CompositionPlan,
        output: impl Into<PathBuf>,
        opts: ExportOpts,
    ) -> FramecutResult<ExportTask> {
        self.start(plan, output.into(), opts, None)
    }

    /// Like [`ExportCoordinator::export`], calling `on_finish` on the worker thread with the
    /// terminal result.
    pub fn export_with_callback(
        &self,
        plan: &CompositionPlan,
        output: impl Into<PathBuf>,
        opts: ExportOpts,
        on_finish: impl FnOnce(&ExportResult) + Send + 'static,
    ) -> FramecutResult<ExportTask> {
        self.start(plan, output.into(), opts, Some(Box::new(on_finish)))
    }

    /// Export into `dir` under a fresh name chosen from the plan's kind and the local time.
    pub fn export_to_dir(
        &self,
        plan: &CompositionPlan,
        dir: &Path,
        opts: ExportOpts,
    ) -> FramecutResult<ExportTask> {
        let output = output_path(
            dir,
            &OutputKind::for_plan(plan),
            chrono::Local::now().naive_local(),
        );
        self.export(plan, output, opts)
    }

    /// Cancel the running export, if any. Returns `true` when a cancellation was requested.
    pub fn cancel(&self) -> bool {
        self.shared.cancel_current()
    }

    fn start(
        &self,
        plan: &CompositionPlan,
        output: PathBuf,
        opts: ExportOpts,
        on_finish: Option<FinishCallback>,
    ) -> FramecutResult<ExportTask> {
        let slot = Arc::new(JobSlot::default());
        let previous = {
            let mut inner = self.shared.lock();
            if inner.state == ExportState::Exporting {
                return Err(FramecutError::AlreadyExporting);
            }
            let previous = inner.state;
            inner.state = ExportState::Exporting;
            inner.job = Some(Arc::clone(&slot));
            previous
        };

        let prepared = match pipeline::prepare(plan, output, opts) {
            Ok(p) => p,
            Err(e) => {
                self.shared.release(&slot, previous);
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let decoder = Arc::clone(&self.decoder);
        let sinks = Arc::clone(&self.sinks);
        let shared = Arc::clone(&self.shared);
        let worker_slot = Arc::clone(&slot);
        let frames = prepared.frame_count;
        let output = prepared.output.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("framecut-export-{id}"))
            .spawn(move || {
                let started = Instant::now();
                let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline::run(&prepared, decoder.as_ref(), sinks.as_ref(), &worker_slot.cancel)
                }))
                .unwrap_or_else(|_| Err(FramecutError::unknown("export worker panicked")));

                let result = shared.finish(&worker_slot, &outcome, &prepared.output);
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match &result {
                    ExportResult::Completed { output } => tracing::info!(
                        id,
                        elapsed_ms,
                        frames = outcome.as_ref().map(|s| s.frames_total).unwrap_or(0),
                        output = %output.display(),
                        "export completed"
                    ),
                    ExportResult::Failed { kind, message } => {
                        tracing::warn!(id, elapsed_ms, ?kind, %message, "export failed")
                    }
                    ExportResult::Cancelled => tracing::info!(id, elapsed_ms, "export cancelled"),
                }
                if let Some(cb) = on_finish {
                    cb(&result);
                }
            });

        if let Err(e) = spawned {
            self.shared.release(&slot, previous);
            return Err(FramecutError::unknown(format!(
                "failed to spawn export worker: {e}"
            )));
        }

        tracing::info!(
            id,
            frames,
            output = %output.display(),
            path = %plan.asset.path.display(),
            "export started"
        );
        Ok(ExportTask {
            slot,
            shared: Arc::clone(&self.shared),
            output,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/export/coordinator.rs"]
mod tests;
